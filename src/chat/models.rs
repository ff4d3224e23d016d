use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::RouterError;

/// Identifier of a chat room, e.g. `text:chat:4a1c...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Validates and wraps a room identifier
    ///
    /// Room ids must be non-empty and carry no leading or trailing whitespace.
    pub fn parse(id: impl Into<String>) -> Result<Self, RouterError> {
        let id = id.into();
        if id.is_empty() || id.trim() != id {
            return Err(RouterError::InvalidRoomId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomId {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomId {
    type Error = RouterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

/// Identifier of a message within a chat document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A chat message as stored in the collaborative chat document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub body: String,
    pub sender: String,
    /// Seconds since the Unix epoch
    pub time: f64,
    /// Set while `time` is still the client clock and the server has not stamped it
    #[serde(default)]
    pub raw_time: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub edited: bool,
}

impl Message {
    /// Creates a server-stamped message with the current time
    pub fn new(
        id: impl Into<MessageId>,
        body: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            sender: sender.into(),
            time: Utc::now().timestamp_millis() as f64 / 1000.0,
            raw_time: false,
            attachments: Vec::new(),
            mentions: Vec::new(),
            deleted: false,
            edited: false,
        }
    }

    /// Marks the message time as provisional (client clock)
    pub fn with_raw_time(mut self) -> Self {
        self.raw_time = true;
        self
    }

    /// The message time as a UTC timestamp, if it is representable
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if !self.time.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((self.time * 1000.0).round() as i64)
    }

    pub fn is_slash_command(&self) -> bool {
        super::is_slash_command(&self.body)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
