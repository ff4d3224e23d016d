pub mod mocks;
pub mod recorders;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{LateWriteChat, MockDocumentStore, MockRoomManager};
#[allow(unused_imports)]
pub use recorders::{record_commands, record_messages, record_rooms, Delivery, Recorder, RoomNotice};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
