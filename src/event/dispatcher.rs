use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{
    events::{EventCategory, EventKinds, MessageEvent},
    handler::{
        invoke_isolated, HandlerResult, MessageCallback, RoomCallback, SlashCommandCallback,
        SubscriptionId,
    },
};
use crate::chat::{CommandPattern, RoomId, SlashCommand};
use crate::document::ChatDocument;
use crate::room::RoomToken;

/// Which rooms a subscription applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomScope {
    /// Every room, including rooms created later
    All,
    Room(RoomId),
}

impl RoomScope {
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            RoomScope::All => None,
            RoomScope::Room(id) => Some(id),
        }
    }
}

impl From<RoomId> for RoomScope {
    fn from(room_id: RoomId) -> Self {
        RoomScope::Room(room_id)
    }
}

impl From<&RoomId> for RoomScope {
    fn from(room_id: &RoomId) -> Self {
        RoomScope::Room(room_id.clone())
    }
}

struct Registration<C> {
    id: SubscriptionId,
    name: &'static str,
    callback: C,
}

struct MessageRegistration {
    id: SubscriptionId,
    name: &'static str,
    kinds: EventKinds,
    callback: MessageCallback,
}

struct SlashRegistration {
    id: SubscriptionId,
    name: &'static str,
    kinds: EventKinds,
    pattern: CommandPattern,
    callback: SlashCommandCallback,
}

#[derive(Default)]
struct Subscribers {
    chat_init: Vec<Registration<RoomCallback>>,
    chat_reset: Vec<Registration<RoomCallback>>,
    chat_msg: HashMap<RoomScope, Vec<MessageRegistration>>,
    slash_cmd: HashMap<RoomScope, Vec<SlashRegistration>>,
}

impl Subscribers {
    fn scopes(room_id: &RoomId) -> [RoomScope; 2] {
        [RoomScope::Room(room_id.clone()), RoomScope::All]
    }
}

/// Holds subscriptions and invokes them for each event
///
/// Callbacks run synchronously on the caller's task. The subscriber table is
/// never locked while a callback runs: every dispatch works on a snapshot of
/// the matching registrations, so callbacks may subscribe or unsubscribe
/// while being invoked. A failing callback never stops delivery to the rest.
pub struct Dispatcher {
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Subscribers::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add_chat_init<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync + 'static,
    {
        let registration = self.registration(callback);
        let id = registration.id;
        self.lock().chat_init.push(registration);
        info!(subscription_id = %id, "Registered chat init callback");
        id
    }

    pub fn add_chat_reset<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync + 'static,
    {
        let registration = self.registration(callback);
        let id = registration.id;
        self.lock().chat_reset.push(registration);
        info!(subscription_id = %id, "Registered chat reset callback");
        id
    }

    pub fn add_chat_msg<F>(
        &self,
        scope: RoomScope,
        kinds: EventKinds,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(&RoomId, &MessageEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.next_id();
        info!(subscription_id = %id, scope = ?scope, "Registered message callback");

        self.lock()
            .chat_msg
            .entry(scope)
            .or_default()
            .push(MessageRegistration {
                id,
                name: std::any::type_name::<F>(),
                kinds,
                callback: Arc::new(callback),
            });
        id
    }

    pub fn add_slash_cmd<F>(
        &self,
        scope: RoomScope,
        pattern: CommandPattern,
        kinds: EventKinds,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(&RoomId, &SlashCommand, &MessageEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.next_id();
        info!(
            subscription_id = %id,
            scope = ?scope,
            pattern = %pattern,
            "Registered slash command callback"
        );

        self.lock()
            .slash_cmd
            .entry(scope)
            .or_default()
            .push(SlashRegistration {
                id,
                name: std::any::type_name::<F>(),
                kinds,
                pattern,
                callback: Arc::new(callback),
            });
        id
    }

    /// Removes one registration; returns false if it was not found
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = Self::count(&subs);

        subs.chat_init.retain(|r| r.id != id);
        subs.chat_reset.retain(|r| r.id != id);
        for registrations in subs.chat_msg.values_mut() {
            registrations.retain(|r| r.id != id);
        }
        for registrations in subs.slash_cmd.values_mut() {
            registrations.retain(|r| r.id != id);
        }
        subs.chat_msg.retain(|_, r| !r.is_empty());
        subs.slash_cmd.retain(|_, r| !r.is_empty());

        let removed = Self::count(&subs) < before;
        if removed {
            debug!(subscription_id = %id, "Removed subscription");
        }
        removed
    }

    /// Drops every subscription scoped to `room_id`; returns how many were dropped
    pub fn remove_room(&self, room_id: &RoomId) -> usize {
        let scope = RoomScope::Room(room_id.clone());
        let mut subs = self.lock();
        let msg = subs.chat_msg.remove(&scope).map_or(0, |r| r.len());
        let slash = subs.slash_cmd.remove(&scope).map_or(0, |r| r.len());
        msg + slash
    }

    pub fn clear(&self) {
        // Dropped outside the lock: callbacks may own router handles
        let previous = std::mem::take(&mut *self.lock());
        drop(previous);
    }

    pub fn subscription_count(&self) -> usize {
        Self::count(&self.lock())
    }

    /// Invokes chat init callbacks in registration order
    pub fn notify_chat_init(&self, room_id: &RoomId, document: &Arc<dyn ChatDocument>) {
        let targets = Self::snapshot(&self.lock().chat_init);
        Self::notify_room(EventCategory::ChatInit, targets, room_id, document);
    }

    pub fn notify_chat_reset(&self, room_id: &RoomId, document: &Arc<dyn ChatDocument>) {
        let targets = Self::snapshot(&self.lock().chat_reset);
        Self::notify_room(EventCategory::ChatReset, targets, room_id, document);
    }

    /// Routes one message event to the slash-command or the regular subscribers
    ///
    /// Stops as soon as `token` is revoked. Returns how many callbacks succeeded.
    pub fn dispatch_message(
        &self,
        room_id: &RoomId,
        event: &MessageEvent,
        token: &RoomToken,
    ) -> usize {
        if !token.is_live() {
            return 0;
        }

        match SlashCommand::parse(&event.message.body) {
            Some(command) => self.dispatch_slash(room_id, &command, event, token),
            None => self.dispatch_regular(room_id, event, token),
        }
    }

    fn dispatch_slash(
        &self,
        room_id: &RoomId,
        command: &SlashCommand,
        event: &MessageEvent,
        token: &RoomToken,
    ) -> usize {
        let scopes = Subscribers::scopes(room_id);
        let mut targets: Vec<(SubscriptionId, &'static str, SlashCommandCallback)> = {
            let subs = self.lock();
            scopes
                .iter()
                .filter_map(|scope| subs.slash_cmd.get(scope))
                .flatten()
                .filter(|r| r.kinds.contains(event.kind) && r.pattern.matches(&command.name))
                .map(|r| (r.id, r.name, r.callback.clone()))
                .collect()
        };
        targets.sort_by_key(|(id, _, _)| *id);

        debug!(
            room_id = %room_id,
            command = %command.name,
            kind = %event.kind,
            targets = targets.len(),
            "Dispatching slash command"
        );

        let mut delivered = 0;
        for (id, name, callback) in targets {
            if !token.is_live() {
                debug!(room_id = %room_id, "Room detached during dispatch");
                break;
            }
            if invoke_isolated(EventCategory::SlashCmd, room_id, id, name, || {
                callback(room_id, command, event)
            }) {
                delivered += 1;
            }
        }
        delivered
    }

    fn dispatch_regular(&self, room_id: &RoomId, event: &MessageEvent, token: &RoomToken) -> usize {
        let scopes = Subscribers::scopes(room_id);
        let mut targets: Vec<(SubscriptionId, &'static str, MessageCallback)> = {
            let subs = self.lock();
            scopes
                .iter()
                .filter_map(|scope| subs.chat_msg.get(scope))
                .flatten()
                .filter(|r| r.kinds.contains(event.kind))
                .map(|r| (r.id, r.name, r.callback.clone()))
                .collect()
        };
        targets.sort_by_key(|(id, _, _)| *id);

        debug!(
            room_id = %room_id,
            kind = %event.kind,
            targets = targets.len(),
            "Dispatching chat message"
        );

        let mut delivered = 0;
        for (id, name, callback) in targets {
            if !token.is_live() {
                debug!(room_id = %room_id, "Room detached during dispatch");
                break;
            }
            if invoke_isolated(EventCategory::ChatMsg, room_id, id, name, || {
                callback(room_id, event)
            }) {
                delivered += 1;
            }
        }
        delivered
    }

    fn notify_room(
        category: EventCategory,
        targets: Vec<(SubscriptionId, &'static str, RoomCallback)>,
        room_id: &RoomId,
        document: &Arc<dyn ChatDocument>,
    ) {
        debug!(
            room_id = %room_id,
            category = %category,
            targets = targets.len(),
            "Notifying room observers"
        );
        for (id, name, callback) in targets {
            invoke_isolated(category, room_id, id, name, || callback(room_id, document));
        }
    }

    fn snapshot(
        registrations: &[Registration<RoomCallback>],
    ) -> Vec<(SubscriptionId, &'static str, RoomCallback)> {
        registrations
            .iter()
            .map(|r| (r.id, r.name, r.callback.clone()))
            .collect()
    }

    fn registration<F>(&self, callback: F) -> Registration<RoomCallback>
    where
        F: Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync + 'static,
    {
        Registration {
            id: self.next_id(),
            name: std::any::type_name::<F>(),
            callback: Arc::new(callback),
        }
    }

    fn count(subs: &Subscribers) -> usize {
        subs.chat_init.len()
            + subs.chat_reset.len()
            + subs.chat_msg.values().map(Vec::len).sum::<usize>()
            + subs.slash_cmd.values().map(Vec::len).sum::<usize>()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
