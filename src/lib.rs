// Library crate for the chat message router
// Routes messages from collaborative chat documents to registered callbacks

pub mod chat;
pub mod config;
pub mod document;
pub mod event;
pub mod extension;
pub mod room;
pub mod router;
pub mod shared;
pub mod telemetry;

// Re-export commonly used types for easier access in tests
pub use chat::{CommandName, CommandPattern, Message, MessageId, RoomId, SlashCommand};
pub use config::{ConfigError, RouterConfig};
pub use document::{ChatDocument, Delta, DocumentChange, InMemoryChat};
pub use event::{
    EventKinds, HandlerError, HandlerResult, MessageEvent, MessageEventKind, RoomScope,
    SubscriptionId,
};
pub use extension::{CollaborationAdapter, RouterExtension, ServerSettings};
pub use room::{RoomInfo, RoomState};
pub use router::MessageRouter;
pub use shared::RouterError;
