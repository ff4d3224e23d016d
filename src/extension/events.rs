use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

use crate::chat::RoomId;

/// Message the collaboration layer attaches to a completed room initialization
pub const ROOM_INITIALIZED_MSG: &str = "Room initialized";

/// Room lifecycle actions reported by the collaboration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "snake_case")]
pub enum RoomAction {
    Initialize,
    Load,
    Save,
    Overwrite,
    Clean,
    #[serde(other)]
    Other,
}

/// A collaboration lifecycle event, as emitted for every collaborative room
#[derive(Debug, Clone, Deserialize)]
pub struct CollaborationEvent {
    pub room: String,
    pub action: RoomAction,
    #[serde(default)]
    pub msg: String,
}

/// What a collaboration event means for the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLifecycle {
    /// A chat room finished initializing and should be connected
    Initialize(RoomId),
    /// A chat room was cleaned up and should be disconnected
    Close(RoomId),
}

impl CollaborationEvent {
    /// Parses a raw event payload; `None` for payloads of another shape
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        CollaborationEvent::deserialize(value).ok()
    }

    /// Classifies the event for chat rooms named with `chat_prefix`
    pub fn classify(&self, chat_prefix: &str) -> Option<ChatLifecycle> {
        if !self.room.starts_with(chat_prefix) {
            return None;
        }
        let room_id = RoomId::parse(self.room.as_str()).ok()?;

        match self.action {
            RoomAction::Initialize if self.msg == ROOM_INITIALIZED_MSG => {
                Some(ChatLifecycle::Initialize(room_id))
            }
            RoomAction::Clean => Some(ChatLifecycle::Close(room_id)),
            _ => None,
        }
    }
}
