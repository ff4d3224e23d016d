//! Router configuration.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading configuration or starting the extension
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No supported collaboration API found on the server")]
    NoCollaborationApi,
}

/// Message router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouterConfig {
    /// Collaboration room prefix that marks a chat document.
    #[serde(default = "default_chat_room_prefix")]
    pub chat_room_prefix: String,
    /// Capacity of the collaboration event queue fed to the extension.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_chat_room_prefix() -> String {
    "text:chat:".to_string()
}

fn default_event_queue_capacity() -> usize {
    256
}

fn default_log_filter() -> String {
    "chat_router=info".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            chat_room_prefix: default_chat_room_prefix(),
            event_queue_capacity: default_event_queue_capacity(),
            log_filter: default_log_filter(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - `CHAT_ROUTER_ROOM_PREFIX`: overrides `chat_room_prefix`
    /// - `RUST_LOG`: overrides `log_filter`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(prefix) = std::env::var("CHAT_ROUTER_ROOM_PREFIX") {
            if !prefix.is_empty() {
                self.chat_room_prefix = prefix;
            }
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            if !filter.is_empty() {
                self.log_filter = filter;
            }
        }
        self
    }
}
