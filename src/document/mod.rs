// Collaborative chat documents as seen by the router
//
// The CRDT itself lives outside this crate. The router only needs to read a
// document's current messages and subscribe to its change stream.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::chat::Message;

pub use memory::{InMemoryChat, Transaction};

mod memory;

/// One low-level delta of the document's message array
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Messages inserted at the current position
    Insert(Vec<Message>),
    /// Items kept unchanged
    Retain(usize),
    /// Items removed at the current position
    Delete(usize),
}

/// All deltas produced by one document transaction, plus the message array
/// as it reads after the transaction
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub transaction: u64,
    pub deltas: Vec<Delta>,
    pub messages: Vec<Message>,
}

impl DocumentChange {
    pub fn has_deletions(&self) -> bool {
        self.deltas.iter().any(|d| matches!(d, Delta::Delete(_)))
    }

    /// Inserted messages in delta order
    pub fn inserted(&self) -> impl Iterator<Item = &Message> {
        self.deltas.iter().flat_map(|delta| match delta {
            Delta::Insert(messages) => messages.as_slice(),
            _ => &[][..],
        })
    }
}

/// Handle to a room's chat document
pub trait ChatDocument: Send + Sync + 'static {
    /// Current readable message collection
    fn messages(&self) -> Vec<Message>;

    /// Subscribes to the document's change stream
    ///
    /// The subscription is released when the receiver is dropped.
    fn subscribe(&self) -> broadcast::Receiver<Arc<DocumentChange>>;

    /// Current messages plus a change stream starting right after them
    ///
    /// Must be atomic: every change is either reflected in the snapshot or
    /// delivered on the receiver, never both and never neither.
    fn snapshot_and_subscribe(&self) -> (Vec<Message>, broadcast::Receiver<Arc<DocumentChange>>);
}
