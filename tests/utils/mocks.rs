#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use chat_router::extension::{DocumentStore, ProviderError, ResetCallback, RoomManager};
use chat_router::{ChatDocument, DocumentChange, InMemoryChat, Message, RoomId};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Document store that creates an in-memory chat per room on first request
#[derive(Default)]
pub struct MockDocumentStore {
    documents: Mutex<HashMap<RoomId, Arc<InMemoryChat>>>,
    failing: Mutex<HashSet<RoomId>>,
    requests: Mutex<Vec<RoomId>>,
}

impl MockDocumentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every request for `room_id` fail
    pub fn fail_room(&self, room_id: &RoomId) {
        self.failing.lock().unwrap().insert(room_id.clone());
    }

    pub fn document(&self, room_id: &RoomId) -> Option<Arc<InMemoryChat>> {
        self.documents.lock().unwrap().get(room_id).cloned()
    }

    pub fn requests(&self) -> Vec<RoomId> {
        self.requests.lock().unwrap().clone()
    }

    fn get_or_create(&self, room_id: &RoomId) -> Result<Arc<InMemoryChat>, ProviderError> {
        self.requests.lock().unwrap().push(room_id.clone());
        if self.failing.lock().unwrap().contains(room_id) {
            return Err(ProviderError::RoomNotFound(room_id.clone()));
        }
        Ok(self
            .documents
            .lock()
            .unwrap()
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(InMemoryChat::new()))
            .clone())
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn get_document(&self, room_id: &RoomId) -> Result<Arc<dyn ChatDocument>, ProviderError> {
        let document: Arc<dyn ChatDocument> = self.get_or_create(room_id)?;
        Ok(document)
    }
}

/// Room manager that keeps each room's reset callback so tests can fire it
#[derive(Default)]
pub struct MockRoomManager {
    store: MockDocumentStore,
    reset_callbacks: Mutex<HashMap<RoomId, Arc<ResetCallback>>>,
}

impl MockRoomManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn document(&self, room_id: &RoomId) -> Option<Arc<InMemoryChat>> {
        self.store.document(room_id)
    }

    /// Replaces the room's document and fires its reset callback
    pub fn reset(&self, room_id: &RoomId) -> Arc<InMemoryChat> {
        let fresh = Arc::new(InMemoryChat::new());
        self.store
            .documents
            .lock()
            .unwrap()
            .insert(room_id.clone(), fresh.clone());

        let callback = self
            .reset_callbacks
            .lock()
            .unwrap()
            .get(room_id)
            .cloned()
            .expect("room was fetched through the manager");
        let replacement: Arc<dyn ChatDocument> = fresh.clone();
        (*callback)(replacement);
        fresh
    }
}

#[async_trait]
impl RoomManager for MockRoomManager {
    async fn get_document(
        &self,
        room_id: &RoomId,
        on_reset: ResetCallback,
    ) -> Result<Arc<dyn ChatDocument>, ProviderError> {
        self.reset_callbacks
            .lock()
            .unwrap()
            .insert(room_id.clone(), Arc::new(on_reset));
        let document: Arc<dyn ChatDocument> = self.store.get_or_create(room_id)?;
        Ok(document)
    }
}

/// Chat document that lands one write in the middle of being attached
///
/// The pending message is written while the router reads the document,
/// after it has started listening for changes.
pub struct LateWriteChat {
    inner: Arc<InMemoryChat>,
    pending: Mutex<Option<Message>>,
}

impl LateWriteChat {
    pub fn new(pending: Message) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(InMemoryChat::new()),
            pending: Mutex::new(Some(pending)),
        })
    }

    pub fn inner(&self) -> &Arc<InMemoryChat> {
        &self.inner
    }

    fn write_pending(&self) {
        if let Some(message) = self.pending.lock().unwrap().take() {
            self.inner.add_message(message);
        }
    }
}

impl ChatDocument for LateWriteChat {
    fn messages(&self) -> Vec<Message> {
        self.write_pending();
        self.inner.messages()
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<DocumentChange>> {
        self.inner.subscribe()
    }

    fn snapshot_and_subscribe(&self) -> (Vec<Message>, broadcast::Receiver<Arc<DocumentChange>>) {
        let attached = self.inner.snapshot_and_subscribe();
        self.write_pending();
        attached
    }
}
