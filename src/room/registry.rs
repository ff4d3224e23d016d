use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::chat::RoomId;
use crate::document::ChatDocument;
use crate::shared::RouterError;

/// Lifecycle of a routed room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Registered, observer not yet attached
    Initializing,
    Active,
    Closed,
}

/// Validity token shared between a room context and its observer task
///
/// Revoking the token stops delivery for the room even if a change
/// notification is already being dispatched.
#[derive(Debug)]
pub struct RoomToken {
    generation: u64,
    live: AtomicBool,
}

impl RoomToken {
    pub(crate) fn new(generation: u64) -> Arc<Self> {
        Arc::new(Self {
            generation,
            live: AtomicBool::new(true),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Returns true only for the call that actually revoked the token
    pub(crate) fn revoke(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }
}

/// Public view of a registered room
#[derive(Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub document: Arc<dyn ChatDocument>,
    pub state: RoomState,
    pub generation: u64,
}

impl fmt::Debug for RoomInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomInfo")
            .field("room_id", &self.room_id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Routing context owned by the registry for one room
pub(crate) struct RoomContext {
    room_id: RoomId,
    document: Arc<dyn ChatDocument>,
    state: RoomState,
    token: Arc<RoomToken>,
    observer: Option<JoinHandle<()>>,
}

impl RoomContext {
    fn new(room_id: RoomId, document: Arc<dyn ChatDocument>, generation: u64) -> Self {
        Self {
            room_id,
            document,
            state: RoomState::Initializing,
            token: RoomToken::new(generation),
            observer: None,
        }
    }

    /// Stops delivery and releases the document subscription; idempotent
    pub(crate) fn detach(&mut self) {
        if self.token.revoke() {
            debug!(
                room_id = %self.room_id,
                generation = self.token.generation(),
                "Detaching room observer"
            );
        }
        if let Some(observer) = self.observer.take() {
            observer.abort();
        }
        self.state = RoomState::Closed;
    }

    pub(crate) fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            document: self.document.clone(),
            state: self.state,
            generation: self.token.generation(),
        }
    }
}

impl Drop for RoomContext {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Maps room ids to their routing contexts
#[derive(Default)]
pub(crate) struct RoomRegistry {
    rooms: HashMap<RoomId, RoomContext>,
    next_generation: u64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Adds a room in the `Initializing` state and returns its token
    pub fn insert(
        &mut self,
        room_id: RoomId,
        document: Arc<dyn ChatDocument>,
    ) -> Result<Arc<RoomToken>, RouterError> {
        if self.rooms.contains_key(&room_id) {
            return Err(RouterError::DuplicateRoom(room_id));
        }
        let context = RoomContext::new(room_id.clone(), document, self.bump_generation());
        let token = context.token.clone();
        self.rooms.insert(room_id, context);
        Ok(token)
    }

    /// Records the observer task and marks the room active
    ///
    /// Ignored if the token no longer belongs to the room's current context.
    pub fn activate(&mut self, room_id: &RoomId, token: &RoomToken, observer: JoinHandle<()>) {
        match self.rooms.get_mut(room_id) {
            Some(context) if context.token.generation() == token.generation() => {
                context.observer = Some(observer);
                context.state = RoomState::Active;
            }
            _ => observer.abort(),
        }
    }

    /// Swaps the room's document; the old observer is detached
    pub fn replace_document(
        &mut self,
        room_id: &RoomId,
        document: Arc<dyn ChatDocument>,
    ) -> Result<Arc<RoomToken>, RouterError> {
        if !self.rooms.contains_key(room_id) {
            return Err(RouterError::UnknownRoom(room_id.clone()));
        }
        let generation = self.bump_generation();
        let context = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RouterError::UnknownRoom(room_id.clone()))?;

        context.detach();
        context.document = document;
        context.token = RoomToken::new(generation);
        context.state = RoomState::Initializing;
        Ok(context.token.clone())
    }

    pub fn get(&self, room_id: &RoomId) -> Result<RoomInfo, RouterError> {
        self.rooms
            .get(room_id)
            .map(RoomContext::info)
            .ok_or_else(|| RouterError::UnknownRoom(room_id.clone()))
    }

    /// Removes and detaches the room's context
    pub fn remove(&mut self, room_id: &RoomId) -> Option<RoomInfo> {
        let mut context = self.rooms.remove(room_id)?;
        context.detach();
        Some(context.info())
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}
