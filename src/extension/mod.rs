// Integration with the collaboration server
//
// Turns room lifecycle events into router registrations, fetching each chat
// document through whichever collaboration API the server exposes.

pub use app::{RouterExtension, ServerSettings};
pub use collaboration::{
    CollaborationAdapter, DocumentStore, ProviderError, ResetCallback, RoomManager,
};
pub use events::{ChatLifecycle, CollaborationEvent, RoomAction, ROOM_INITIALIZED_MSG};

mod app;
mod collaboration;
mod events;
