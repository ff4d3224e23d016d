use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::RoomToken;
use crate::chat::{Message, MessageId, RoomId};
use crate::document::{ChatDocument, DocumentChange};
use crate::event::{Dispatcher, MessageEvent};

/// Translates raw document changes into logical message events
///
/// Keeps the last observed content of every routed message so that edits can
/// be told apart from duplicates and deletions can carry the removed content.
/// One [`DocumentChange`] is the deduplication window.
#[derive(Debug, Default)]
pub struct MessageTracker {
    known: HashMap<MessageId, Message>,
}

impl MessageTracker {
    /// Starts from the messages a document already holds
    pub fn seeded(messages: &[Message]) -> Self {
        let known = messages
            .iter()
            .filter(|m| !m.raw_time && !m.deleted)
            .map(|m| (m.id.clone(), m.clone()))
            .collect();
        Self { known }
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Events produced by one transaction, in document order
    pub fn translate(&mut self, change: &DocumentChange) -> Vec<MessageEvent> {
        let present: Option<HashSet<&MessageId>> = change
            .has_deletions()
            .then(|| change.messages.iter().map(|m| &m.id).collect());

        // Last insert of an id within the transaction wins
        let mut order: Vec<&MessageId> = Vec::new();
        let mut latest: HashMap<&MessageId, &Message> = HashMap::new();
        for message in change.inserted() {
            if latest.insert(&message.id, message).is_none() {
                order.push(&message.id);
            }
        }

        let mut events = Vec::new();
        for id in order {
            // Inserted and removed again in this transaction
            if present.as_ref().is_some_and(|p| !p.contains(id)) {
                continue;
            }
            self.observe(latest[id], &mut events);
        }

        if let Some(present) = present {
            self.sweep(&present, &mut events);
        }
        events
    }

    /// Rebuilds state from a full message snapshot after missed changes
    pub fn reconcile(&mut self, messages: &[Message]) -> Vec<MessageEvent> {
        let mut events = Vec::new();
        for message in messages {
            self.observe(message, &mut events);
        }
        let present: HashSet<&MessageId> = messages.iter().map(|m| &m.id).collect();
        self.sweep(&present, &mut events);
        events
    }

    fn observe(&mut self, message: &Message, events: &mut Vec<MessageEvent>) {
        // Provisional until the server stamps the time
        if message.raw_time {
            return;
        }

        match self.known.get(&message.id) {
            None if message.deleted => {}
            None => {
                self.known.insert(message.id.clone(), message.clone());
                events.push(MessageEvent::added(message.clone()));
            }
            Some(_) if message.deleted => {
                if let Some(last) = self.known.remove(&message.id) {
                    events.push(MessageEvent::deleted(last));
                }
            }
            Some(previous) if previous == message => {}
            Some(_) => {
                self.known.insert(message.id.clone(), message.clone());
                events.push(MessageEvent::updated(message.clone()));
            }
        }
    }

    /// Emits deletions for known messages missing from `present`
    fn sweep(&mut self, present: &HashSet<&MessageId>, events: &mut Vec<MessageEvent>) {
        let gone: Vec<MessageId> = self
            .known
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();

        let mut removed: Vec<Message> = gone
            .iter()
            .filter_map(|id| self.known.remove(id))
            .collect();
        removed.sort_by(|a, b| a.time.total_cmp(&b.time).then_with(|| a.id.cmp(&b.id)));

        events.extend(removed.into_iter().map(MessageEvent::deleted));
    }
}

/// Observer attached to one room's document change stream
pub(crate) struct RoomSubscription {
    room_id: RoomId,
    receiver: broadcast::Receiver<Arc<DocumentChange>>,
    tracker: MessageTracker,
    token: Arc<RoomToken>,
    dispatcher: Arc<Dispatcher>,
}

impl RoomSubscription {
    pub fn new(
        room_id: RoomId,
        document: &Arc<dyn ChatDocument>,
        token: Arc<RoomToken>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (messages, receiver) = document.snapshot_and_subscribe();
        let tracker = MessageTracker::seeded(&messages);
        Self {
            room_id,
            receiver,
            tracker,
            token,
            dispatcher,
        }
    }

    /// Spawns the task that routes the room's changes to the dispatcher
    ///
    /// The task owns the stream receiver, so the document subscription is
    /// released when the task finishes or is aborted.
    pub fn start(self) -> JoinHandle<()> {
        let Self {
            room_id,
            mut receiver,
            mut tracker,
            token,
            dispatcher,
        } = self;

        info!(
            room_id = %room_id,
            generation = token.generation(),
            known_messages = tracker.known_count(),
            "Starting room observer"
        );

        tokio::spawn(async move {
            let mut resync = false;

            loop {
                let change = match receiver.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            room_id = %room_id,
                            skipped,
                            "Room observer lagged behind document changes, resyncing"
                        );
                        resync = true;
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if !token.is_live() {
                    break;
                }

                let events = if resync {
                    resync = false;
                    tracker.reconcile(&change.messages)
                } else {
                    tracker.translate(&change)
                };

                debug!(
                    room_id = %room_id,
                    transaction = change.transaction,
                    deltas = change.deltas.len(),
                    events = events.len(),
                    "Translated document change"
                );

                for event in &events {
                    dispatcher.dispatch_message(&room_id, event, &token);
                }
            }

            debug!(room_id = %room_id, "Room observer stopped");
        })
    }
}
