// Public API - what other modules can use
pub use observer::MessageTracker;
pub use registry::{RoomInfo, RoomState, RoomToken};

pub(crate) use observer::RoomSubscription;
pub(crate) use registry::RoomRegistry;

// Internal modules
mod observer;
mod registry;
