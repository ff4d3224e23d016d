// Event routing components
//
// Logical message events, the callback types subscribers register, and the
// dispatcher that delivers events to them.

// Public API - what other modules can use
pub use dispatcher::{Dispatcher, RoomScope};
pub use events::{EventCategory, EventKinds, MessageEvent, MessageEventKind};
pub use handler::{
    HandlerError, HandlerResult, MessageCallback, RoomCallback, SlashCommandCallback,
    SubscriptionId,
};

// Internal modules
mod dispatcher;
mod events;
mod handler;
