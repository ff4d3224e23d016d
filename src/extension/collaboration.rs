use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::app::ServerSettings;
use crate::chat::RoomId;
use crate::config::ConfigError;
use crate::document::ChatDocument;
use crate::router::MessageRouter;

/// Failures while retrieving a room's chat document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Room {0} does not hold a chat document")]
    NotAChat(RoomId),

    #[error("Collaboration provider unavailable: {0}")]
    Unavailable(String),
}

/// Invoked with the replacement document whenever the server resets a room
pub type ResetCallback = Box<dyn Fn(Arc<dyn ChatDocument>) + Send + Sync>;

/// Collaboration API that hands out live documents by room id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, room_id: &RoomId) -> Result<Arc<dyn ChatDocument>, ProviderError>;
}

/// Room-manager collaboration API, where documents can be reset under the router
#[async_trait]
pub trait RoomManager: Send + Sync {
    async fn get_document(
        &self,
        room_id: &RoomId,
        on_reset: ResetCallback,
    ) -> Result<Arc<dyn ChatDocument>, ProviderError>;
}

/// The collaboration API shape found on the server at startup
#[derive(Clone)]
pub enum CollaborationAdapter {
    Collaboration(Arc<dyn DocumentStore>),
    ServerDocuments(Arc<dyn RoomManager>),
}

impl CollaborationAdapter {
    /// Picks the adapter for the APIs installed on the server
    ///
    /// A room manager takes precedence over a plain document store.
    pub fn detect(settings: &ServerSettings) -> Result<Self, ConfigError> {
        if let Some(manager) = &settings.room_manager {
            return Ok(CollaborationAdapter::ServerDocuments(manager.clone()));
        }
        if let Some(store) = &settings.document_store {
            return Ok(CollaborationAdapter::Collaboration(store.clone()));
        }
        Err(ConfigError::NoCollaborationApi)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CollaborationAdapter::Collaboration(_) => "collaboration",
            CollaborationAdapter::ServerDocuments(_) => "server_documents",
        }
    }

    /// Retrieves the chat document for `room_id`
    ///
    /// With the room-manager API, later resets of the document are forwarded
    /// to `router` as room resets.
    pub async fn fetch_document(
        &self,
        room_id: &RoomId,
        router: &MessageRouter,
    ) -> Result<Arc<dyn ChatDocument>, ProviderError> {
        match self {
            CollaborationAdapter::Collaboration(store) => store.get_document(room_id).await,
            CollaborationAdapter::ServerDocuments(manager) => {
                let router = router.clone();
                let reset_room = room_id.clone();
                let on_reset: ResetCallback = Box::new(move |document| {
                    match router.reset_room(&reset_room, document) {
                        Ok(()) => debug!(room_id = %reset_room, "Forwarded document reset"),
                        Err(e) => warn!(
                            room_id = %reset_room,
                            error = %e,
                            "Ignoring document reset"
                        ),
                    }
                });
                manager.get_document(room_id, on_reset).await
            }
        }
    }
}
