//! Recording callbacks - capture deliveries on a channel for later assertions
#![allow(dead_code)] // Test utilities may not all be used in every test

use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, timeout, Duration};

use chat_router::{
    ChatDocument, HandlerResult, Message, MessageEvent, MessageEventKind, RoomId, SlashCommand,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_PERIOD: Duration = Duration::from_millis(50);

// ============================================================================
// Delivery Records
// ============================================================================

/// One message event as seen by a message or slash-command callback
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub room_id: RoomId,
    pub kind: MessageEventKind,
    pub message: Message,
    pub command: Option<SlashCommand>,
}

impl Delivery {
    pub fn id(&self) -> &str {
        self.message.id.as_str()
    }
}

/// One chat init or reset notification
#[derive(Debug, Clone, PartialEq)]
pub struct RoomNotice {
    pub room_id: RoomId,
    pub message_count: usize,
}

// ============================================================================
// Recorder
// ============================================================================

pub struct Recorder<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
}

impl<T: Debug + Send + 'static> Recorder<T> {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            sender,
            receiver: Mutex::new(receiver),
        })
    }

    fn record(&self, item: T) {
        // Receiver lives as long as the recorder
        let _ = self.sender.send(item);
    }

    /// Waits for the next recorded item, failing the test on timeout
    pub async fn next(&self) -> T {
        let mut receiver = self.receiver.lock().await;
        match timeout(RECV_TIMEOUT, receiver.recv()).await {
            Ok(Some(item)) => item,
            Ok(None) => panic!("recorder channel closed"),
            Err(_) => panic!("timed out waiting for a recorded callback"),
        }
    }

    /// Collects the next `n` items
    pub async fn take(&self, n: usize) -> Vec<T> {
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(self.next().await);
        }
        items
    }

    /// Collects items up to and including the first one matching `done`
    pub async fn collect_until(&self, done: impl Fn(&T) -> bool) -> Vec<T> {
        let mut items = Vec::new();
        loop {
            let item = self.next().await;
            let finished = done(&item);
            items.push(item);
            if finished {
                return items;
            }
        }
    }

    /// Asserts nothing more arrives within a short quiet period
    pub async fn assert_silent(&self) {
        sleep(QUIET_PERIOD).await;
        let mut receiver = self.receiver.lock().await;
        if let Ok(item) = receiver.try_recv() {
            panic!("unexpected callback: {:?}", item);
        }
    }
}

impl Recorder<Delivery> {
    /// Waits for deliveries until the message with `sentinel_id` shows up
    ///
    /// The sentinel itself is not returned.
    pub async fn until_sentinel(&self, sentinel_id: &str) -> Vec<Delivery> {
        let mut items = self.collect_until(|d| d.id() == sentinel_id).await;
        items.pop();
        items
    }
}

// ============================================================================
// Callback Factories
// ============================================================================

pub fn record_messages(
    recorder: &Arc<Recorder<Delivery>>,
) -> impl Fn(&RoomId, &MessageEvent) -> HandlerResult + Send + Sync + 'static {
    let recorder = recorder.clone();
    move |room_id: &RoomId, event: &MessageEvent| {
        recorder.record(Delivery {
            room_id: room_id.clone(),
            kind: event.kind,
            message: event.message.clone(),
            command: None,
        });
        Ok(())
    }
}

pub fn record_commands(
    recorder: &Arc<Recorder<Delivery>>,
) -> impl Fn(&RoomId, &SlashCommand, &MessageEvent) -> HandlerResult + Send + Sync + 'static {
    let recorder = recorder.clone();
    move |room_id: &RoomId, command: &SlashCommand, event: &MessageEvent| {
        recorder.record(Delivery {
            room_id: room_id.clone(),
            kind: event.kind,
            message: event.message.clone(),
            command: Some(command.clone()),
        });
        Ok(())
    }
}

pub fn record_rooms(
    recorder: &Arc<Recorder<RoomNotice>>,
) -> impl Fn(&RoomId, &Arc<dyn ChatDocument>) -> HandlerResult + Send + Sync + 'static {
    let recorder = recorder.clone();
    move |room_id: &RoomId, document: &Arc<dyn ChatDocument>| {
        recorder.record(RoomNotice {
            room_id: room_id.clone(),
            message_count: document.messages().len(),
        });
        Ok(())
    }
}
