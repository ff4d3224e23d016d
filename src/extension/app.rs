use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, instrument, warn};

use super::collaboration::{CollaborationAdapter, DocumentStore, RoomManager};
use super::events::{ChatLifecycle, CollaborationEvent};
use crate::config::{ConfigError, RouterConfig};
use crate::router::MessageRouter;

/// Server-wide settings shared between extensions
///
/// Holds the collaboration API handles the host installed and, once the
/// router extension has started, the router itself.
#[derive(Clone, Default)]
pub struct ServerSettings {
    pub document_store: Option<Arc<dyn DocumentStore>>,
    pub room_manager: Option<Arc<dyn RoomManager>>,
    router: Option<MessageRouter>,
}

impl ServerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    pub fn with_room_manager(mut self, manager: Arc<dyn RoomManager>) -> Self {
        self.room_manager = Some(manager);
        self
    }

    /// The running router, if the router extension has started
    pub fn router(&self) -> Option<&MessageRouter> {
        self.router.as_ref()
    }

    fn install_router(&mut self, router: MessageRouter) {
        self.router = Some(router);
    }

    fn take_router(&mut self) -> Option<MessageRouter> {
        self.router.take()
    }
}

/// Connects chat rooms announced by the collaboration layer to the router
pub struct RouterExtension {
    router: MessageRouter,
    adapter: CollaborationAdapter,
    listeners: Mutex<Vec<AbortHandle>>,
    stopped: AtomicBool,
}

impl RouterExtension {
    pub const NAME: &'static str = "chat_router";

    /// Creates the router and publishes it in `settings`
    #[instrument(skip_all)]
    pub fn start(settings: &mut ServerSettings, config: RouterConfig) -> Result<Self, ConfigError> {
        let started = Instant::now();

        let adapter = CollaborationAdapter::detect(settings)?;
        let router = MessageRouter::new(config);
        settings.install_router(router.clone());

        info!(
            extension = Self::NAME,
            adapter = adapter.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Initialized RouterExtension"
        );
        Ok(Self {
            router,
            adapter,
            listeners: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn adapter(&self) -> &CollaborationAdapter {
        &self.adapter
    }

    /// Creates a bounded queue for collaboration events, sized from config
    pub fn event_channel(&self) -> (mpsc::Sender<Value>, mpsc::Receiver<Value>) {
        mpsc::channel(self.router.config().event_queue_capacity.max(1))
    }

    /// Handles one collaboration event payload
    ///
    /// Returns true if the event connected or disconnected a chat room.
    /// Failures are logged and never returned. Events are ignored once the
    /// extension has stopped.
    pub async fn on_collaboration_event(&self, payload: &Value) -> bool {
        if self.is_stopped() {
            debug!("Ignoring collaboration event after stop");
            return false;
        }

        let Some(event) = CollaborationEvent::from_value(payload) else {
            debug!(payload = %payload, "Ignoring malformed collaboration event");
            return false;
        };

        match event.classify(&self.router.config().chat_room_prefix) {
            Some(ChatLifecycle::Initialize(room_id)) => {
                info!(room_id = %room_id, "New chat room detected");

                if self.router.get_room(&room_id).is_ok() {
                    debug!(room_id = %room_id, "Chat room already connected");
                    return false;
                }

                let document = match self.adapter.fetch_document(&room_id, &self.router).await {
                    Ok(document) => document,
                    Err(e) => {
                        error!(room_id = %room_id, error = %e, "Failed to get chat document");
                        return false;
                    }
                };

                // Stopped while the document was being fetched
                if self.is_stopped() {
                    return false;
                }

                match self.router.register_room(room_id.clone(), document) {
                    Ok(()) => true,
                    Err(e) if e.is_duplicate() => false,
                    Err(e) => {
                        error!(room_id = %room_id, error = %e, "Failed to connect chat room");
                        false
                    }
                }
            }
            Some(ChatLifecycle::Close(room_id)) => self.router.unregister_room(&room_id),
            None => false,
        }
    }

    /// Processes events from `events` in order until the sender side closes
    ///
    /// The listener is aborted by [`RouterExtension::stop`].
    pub fn listen(self: Arc<Self>, mut events: mpsc::Receiver<Value>) -> JoinHandle<()> {
        let extension = self.clone();
        let listener = tokio::spawn(async move {
            while let Some(payload) = events.recv().await {
                extension.on_collaboration_event(&payload).await;
            }
            debug!("Collaboration event stream closed");
        });

        let mut listeners = self.listeners();
        listeners.retain(|handle| !handle.is_finished());
        listeners.push(listener.abort_handle());
        listener
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stops all listeners, tears the router down and removes it from `settings`
    pub fn stop(&self, settings: &mut ServerSettings) {
        self.stopped.store(true, Ordering::Release);
        for listener in self.listeners().drain(..) {
            listener.abort();
        }

        self.router.cleanup();
        if settings.take_router().is_none() {
            warn!("Router was not installed in server settings");
        }
        info!(extension = Self::NAME, "Stopped RouterExtension");
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<AbortHandle>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
