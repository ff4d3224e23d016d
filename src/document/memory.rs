use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChatDocument, Delta, DocumentChange};
use crate::chat::{Message, MessageId};

const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// In-memory chat document that emits Yjs-style array deltas
///
/// Every call to [`InMemoryChat::transact`] becomes one [`DocumentChange`].
/// Edits are written as delete + insert of the same item, the way a replicated
/// array represents replacement.
pub struct InMemoryChat {
    state: Mutex<ChatState>,
    sender: broadcast::Sender<Arc<DocumentChange>>,
}

struct ChatState {
    messages: Vec<Message>,
    next_transaction: u64,
}

impl Default for InMemoryChat {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChat {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Creates a document whose change stream buffers `capacity` transactions
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(ChatState {
                messages: Vec::new(),
                next_transaction: 1,
            }),
            sender,
        }
    }

    /// Creates a document that already holds `messages` (no change is emitted)
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let chat = Self::new();
        chat.lock().messages = messages;
        chat
    }

    /// Runs `f` as a single transaction and emits its deltas as one change
    pub fn transact<R>(&self, f: impl FnOnce(&mut Transaction<'_>) -> R) -> R {
        let mut state = self.lock();
        let ChatState {
            messages,
            next_transaction,
        } = &mut *state;

        let mut txn = Transaction {
            messages: &mut *messages,
            deltas: Vec::new(),
        };
        let result = f(&mut txn);
        let deltas = txn.deltas;

        if deltas.is_empty() {
            return result;
        }

        let change = DocumentChange {
            transaction: *next_transaction,
            deltas,
            messages: messages.clone(),
        };
        *next_transaction += 1;

        // Sending while locked keeps the stream in transaction order
        match self.sender.send(Arc::new(change)) {
            Ok(receivers) => debug!(receivers, "Chat document change emitted"),
            Err(_) => debug!("Chat document change emitted with no subscribers"),
        }

        result
    }

    pub fn add_message(&self, message: Message) {
        self.transact(|txn| txn.push(message));
    }

    /// Replaces the message with the same id; returns false if it does not exist
    pub fn update_message(&self, message: Message) -> bool {
        self.transact(|txn| txn.replace(message))
    }

    /// Removes the message from the array
    pub fn delete_message(&self, id: &MessageId) -> bool {
        self.transact(|txn| txn.remove(id))
    }

    /// Flags the message as deleted and clears its body, keeping the item
    pub fn soft_delete_message(&self, id: &MessageId) -> bool {
        self.transact(|txn| {
            let Some(mut message) = txn.get(id).cloned() else {
                return false;
            };
            message.deleted = true;
            message.body.clear();
            txn.replace(message)
        })
    }

    /// Number of live change-stream subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChatDocument for InMemoryChat {
    fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<DocumentChange>> {
        self.sender.subscribe()
    }

    fn snapshot_and_subscribe(&self) -> (Vec<Message>, broadcast::Receiver<Arc<DocumentChange>>) {
        // Changes are sent while the state lock is held
        let state = self.lock();
        (state.messages.clone(), self.sender.subscribe())
    }
}

/// Mutations recorded within one [`InMemoryChat::transact`] call
pub struct Transaction<'a> {
    messages: &'a mut Vec<Message>,
    deltas: Vec<Delta>,
}

impl Transaction<'_> {
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    /// Appends a message
    pub fn push(&mut self, message: Message) {
        let len = self.messages.len();
        if len > 0 {
            self.deltas.push(Delta::Retain(len));
        }
        self.deltas.push(Delta::Insert(vec![message.clone()]));
        self.messages.push(message);
    }

    /// Replaces the item holding `message.id` via delete + insert
    pub fn replace(&mut self, message: Message) -> bool {
        let Some(index) = self.position(&message.id) else {
            return false;
        };
        if index > 0 {
            self.deltas.push(Delta::Retain(index));
        }
        self.deltas.push(Delta::Delete(1));
        self.deltas.push(Delta::Insert(vec![message.clone()]));
        self.messages[index] = message;
        true
    }

    pub fn remove(&mut self, id: &MessageId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if index > 0 {
            self.deltas.push(Delta::Retain(index));
        }
        self.deltas.push(Delta::Delete(1));
        self.messages.remove(index);
        true
    }

    /// Records a raw delta without touching the array
    ///
    /// Collaboration layers sometimes re-announce items they already hold;
    /// this lets callers reproduce that.
    pub fn record(&mut self, delta: Delta) {
        self.deltas.push(delta);
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }
}
