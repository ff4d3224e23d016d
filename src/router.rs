use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tracing::{info, instrument, warn};

use crate::chat::{CommandPattern, RoomId, SlashCommand};
use crate::config::RouterConfig;
use crate::document::ChatDocument;
use crate::event::{
    Dispatcher, EventKinds, HandlerResult, MessageEvent, RoomScope, SubscriptionId,
};
use crate::room::{RoomInfo, RoomRegistry, RoomSubscription};
use crate::shared::RouterError;

/// Routes chat messages from room documents to registered callbacks
///
/// The router provides callback points for:
/// 1. New chat rooms (`observe_chat_init`)
/// 2. Document resets (`observe_chat_reset`)
/// 3. Slash commands (`observe_slash_cmd_msg`)
/// 4. Regular, non-slash messages (`observe_chat_msg`)
///
/// Cloning is cheap; all clones share the same rooms and subscriptions.
#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    rooms: Mutex<RoomRegistry>,
    dispatcher: Arc<Dispatcher>,
    config: RouterConfig,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl MessageRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                rooms: Mutex::new(RoomRegistry::new()),
                dispatcher: Arc::new(Dispatcher::new()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Connects a room's document to the router
    ///
    /// Attaches an observer to the document's change stream, then notifies
    /// chat init callbacks. Must be called from within a tokio runtime.
    #[instrument(skip(self, document), fields(room_id = %room_id))]
    pub fn register_room(
        &self,
        room_id: RoomId,
        document: Arc<dyn ChatDocument>,
    ) -> Result<(), RouterError> {
        {
            let mut rooms = self.rooms();
            if rooms.contains(&room_id) {
                warn!(room_id = %room_id, "Chat already connected to router");
                return Err(RouterError::DuplicateRoom(room_id));
            }
            if Handle::try_current().is_err() {
                return Err(RouterError::NoRuntime(room_id));
            }

            let token = rooms.insert(room_id.clone(), document.clone())?;
            let observer = RoomSubscription::new(
                room_id.clone(),
                &document,
                token.clone(),
                self.inner.dispatcher.clone(),
            )
            .start();
            rooms.activate(&room_id, &token, observer);
        }

        info!(room_id = %room_id, "Connected chat to router");
        self.inner.dispatcher.notify_chat_init(&room_id, &document);
        Ok(())
    }

    /// Disconnects a room; unknown rooms are ignored
    ///
    /// No events are delivered for the room once this returns, and callbacks
    /// scoped to the room are dropped.
    #[instrument(skip(self), fields(room_id = %room_id))]
    pub fn unregister_room(&self, room_id: &RoomId) -> bool {
        let Some(_closed) = self.rooms().remove(room_id) else {
            return false;
        };

        let dropped = self.inner.dispatcher.remove_room(room_id);
        info!(
            room_id = %room_id,
            dropped_subscriptions = dropped,
            "Disconnected chat from router"
        );
        true
    }

    /// Swaps a room's document after the collaboration layer reset it
    ///
    /// Room subscriptions are kept; chat reset callbacks are notified with
    /// the new document.
    #[instrument(skip(self, document), fields(room_id = %room_id))]
    pub fn reset_room(
        &self,
        room_id: &RoomId,
        document: Arc<dyn ChatDocument>,
    ) -> Result<(), RouterError> {
        warn!(room_id = %room_id, "Detected chat document reset");
        {
            let mut rooms = self.rooms();
            if !rooms.contains(room_id) {
                return Err(RouterError::UnknownRoom(room_id.clone()));
            }
            if Handle::try_current().is_err() {
                return Err(RouterError::NoRuntime(room_id.clone()));
            }

            let token = rooms.replace_document(room_id, document.clone())?;
            let observer = RoomSubscription::new(
                room_id.clone(),
                &document,
                token.clone(),
                self.inner.dispatcher.clone(),
            )
            .start();
            rooms.activate(room_id, &token, observer);
        }

        self.inner.dispatcher.notify_chat_reset(room_id, &document);
        Ok(())
    }

    pub fn get_room(&self, room_id: &RoomId) -> Result<RoomInfo, RouterError> {
        self.rooms().get(room_id)
    }

    /// Ids of all connected rooms, sorted
    pub fn active_rooms(&self) -> Vec<RoomId> {
        self.rooms().room_ids()
    }

    /// Registers a callback for newly connected rooms
    pub fn observe_chat_init<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.add_chat_init(callback)
    }

    /// Registers a callback for document resets
    pub fn observe_chat_reset<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.add_chat_reset(callback)
    }

    /// Registers a callback for added or updated regular messages
    pub fn observe_chat_msg<F>(
        &self,
        scope: impl Into<RoomScope>,
        callback: F,
    ) -> Result<SubscriptionId, RouterError>
    where
        F: Fn(&RoomId, &MessageEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.observe_chat_msg_with(scope, EventKinds::ACTIVE, callback)
    }

    /// Registers a callback for regular messages of the given kinds
    pub fn observe_chat_msg_with<F>(
        &self,
        scope: impl Into<RoomScope>,
        kinds: EventKinds,
        callback: F,
    ) -> Result<SubscriptionId, RouterError>
    where
        F: Fn(&RoomId, &MessageEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let scope: RoomScope = scope.into();
        let _rooms = self.lock_scope(&scope)?;
        Ok(self.inner.dispatcher.add_chat_msg(scope, kinds, callback))
    }

    /// Registers a callback for added or updated slash commands matching `pattern`
    pub fn observe_slash_cmd_msg<F>(
        &self,
        scope: impl Into<RoomScope>,
        pattern: CommandPattern,
        callback: F,
    ) -> Result<SubscriptionId, RouterError>
    where
        F: Fn(&RoomId, &SlashCommand, &MessageEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.observe_slash_cmd_msg_with(scope, pattern, EventKinds::ACTIVE, callback)
    }

    /// Registers a callback for slash commands of the given kinds
    pub fn observe_slash_cmd_msg_with<F>(
        &self,
        scope: impl Into<RoomScope>,
        pattern: CommandPattern,
        kinds: EventKinds,
        callback: F,
    ) -> Result<SubscriptionId, RouterError>
    where
        F: Fn(&RoomId, &SlashCommand, &MessageEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let scope: RoomScope = scope.into();
        let _rooms = self.lock_scope(&scope)?;
        Ok(self
            .inner
            .dispatcher
            .add_slash_cmd(scope, pattern, kinds, callback))
    }

    /// Removes a subscription; returns false if it was already gone
    pub fn unobserve(&self, id: SubscriptionId) -> bool {
        self.inner.dispatcher.remove(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.dispatcher.subscription_count()
    }

    /// Disconnects every room and drops every subscription
    pub fn cleanup(&self) {
        info!("Cleaning up MessageRouter");

        for room_id in self.active_rooms() {
            self.unregister_room(&room_id);
        }
        self.inner.dispatcher.clear();

        info!("MessageRouter cleanup complete");
    }

    /// Checks that a room scope names a connected room
    ///
    /// The returned guard must be held until the subscription is stored, so the
    /// room cannot be unregistered in between. Lock order: rooms, then
    /// subscribers.
    fn lock_scope(&self, scope: &RoomScope) -> Result<MutexGuard<'_, RoomRegistry>, RouterError> {
        let rooms = self.rooms();
        if let Some(room_id) = scope.room() {
            if !rooms.contains(room_id) {
                return Err(RouterError::UnknownRoom(room_id.clone()));
            }
        }
        Ok(rooms)
    }

    fn rooms(&self) -> MutexGuard<'_, RoomRegistry> {
        self.inner.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
