use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use super::events::{EventCategory, MessageEvent};
use crate::chat::{RoomId, SlashCommand};
use crate::document::ChatDocument;

/// Errors a callback can report back to the dispatcher
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        HandlerError::Panic(msg)
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        HandlerError::Failed(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        HandlerError::Failed(msg.to_string())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Called with the room id and its document when a room is created or reset
pub type RoomCallback = Arc<dyn Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync>;

/// Called for regular (non-slash) message events
pub type MessageCallback = Arc<dyn Fn(&RoomId, &MessageEvent) -> HandlerResult + Send + Sync>;

/// Called for slash-command message events with the parsed command
pub type SlashCommandCallback =
    Arc<dyn Fn(&RoomId, &SlashCommand, &MessageEvent) -> HandlerResult + Send + Sync>;

/// Handle returned by every registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Runs one callback, containing both returned errors and panics
///
/// Returns whether the callback succeeded. Failures are logged and never
/// propagate to the caller.
pub(crate) fn invoke_isolated(
    category: EventCategory,
    room_id: &RoomId,
    subscription: SubscriptionId,
    callback_name: &'static str,
    f: impl FnOnce() -> HandlerResult,
) -> bool {
    let outcome = catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));

    match outcome {
        Ok(()) => true,
        Err(e) => {
            error!(
                room_id = %room_id,
                category = %category,
                subscription_id = %subscription,
                callback = callback_name,
                error = %e,
                "Callback failed"
            );
            false
        }
    }
}
