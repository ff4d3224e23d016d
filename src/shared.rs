use thiserror::Error;

use crate::chat::RoomId;

/// Errors returned by the router's registration and room APIs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Room already registered: {0}")]
    DuplicateRoom(RoomId),

    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Invalid room id: {0:?}")]
    InvalidRoomId(String),

    #[error("Invalid command pattern '{pattern}': {reason}")]
    InvalidCommandPattern { pattern: String, reason: String },

    #[error("No async runtime available to observe room {0}")]
    NoRuntime(RoomId),
}

impl RouterError {
    /// Whether the error only means the requested state already exists
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RouterError::DuplicateRoom(_))
    }

    pub(crate) fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::InvalidCommandPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use crate::chat::{Message, RoomId};
    use crate::document::InMemoryChat;

    /// Parses a room id, panicking on invalid input
    pub fn room(id: &str) -> RoomId {
        id.parse().expect("valid room id")
    }

    /// Builds a stamped message with the given id and body
    pub fn message(id: &str, body: &str) -> Message {
        Message::new(id, body, "user")
    }

    /// An empty in-memory chat document
    pub fn empty_chat() -> Arc<InMemoryChat> {
        Arc::new(InMemoryChat::new())
    }
}
