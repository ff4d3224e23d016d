use std::ops::BitOr;
use strum_macros::{AsRefStr, Display};

use crate::chat::Message;

/// What happened to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MessageEventKind {
    Added,
    Updated,
    Deleted,
}

/// Callback categories a subscriber can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventCategory {
    /// A new chat room was detected
    ChatInit,
    /// A room's document was replaced
    ChatReset,
    /// A message whose trimmed body starts with `/`
    SlashCmd,
    /// Any other message
    ChatMsg,
}

/// A logical message event derived from one or more document deltas
///
/// Deletion events carry the last content observed before the message was
/// removed or flagged as deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub kind: MessageEventKind,
    pub message: Message,
}

impl MessageEvent {
    pub fn added(message: Message) -> Self {
        Self {
            kind: MessageEventKind::Added,
            message,
        }
    }

    pub fn updated(message: Message) -> Self {
        Self {
            kind: MessageEventKind::Updated,
            message,
        }
    }

    pub fn deleted(message: Message) -> Self {
        Self {
            kind: MessageEventKind::Deleted,
            message,
        }
    }

    /// The category this event is routed under
    pub fn category(&self) -> EventCategory {
        if self.message.is_slash_command() {
            EventCategory::SlashCmd
        } else {
            EventCategory::ChatMsg
        }
    }
}

/// Set of message event kinds a subscription wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKinds(u8);

impl EventKinds {
    pub const ADDED: Self = Self(1);
    pub const UPDATED: Self = Self(1 << 1);
    pub const DELETED: Self = Self(1 << 2);
    /// Added or updated, the default for message subscriptions
    pub const ACTIVE: Self = Self(Self::ADDED.0 | Self::UPDATED.0);
    pub const ALL: Self = Self(Self::ACTIVE.0 | Self::DELETED.0);

    pub fn contains(self, kind: MessageEventKind) -> bool {
        self.0 & Self::from(kind).0 != 0
    }
}

impl Default for EventKinds {
    fn default() -> Self {
        Self::ACTIVE
    }
}

impl From<MessageEventKind> for EventKinds {
    fn from(kind: MessageEventKind) -> Self {
        match kind {
            MessageEventKind::Added => Self::ADDED,
            MessageEventKind::Updated => Self::UPDATED,
            MessageEventKind::Deleted => Self::DELETED,
        }
    }
}

impl BitOr for EventKinds {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
