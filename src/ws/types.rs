//! WebSocket types and configuration

use std::time::Duration;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to, including query parameters
    pub url: String,
    /// Interval for keepalive ping frames (None disables keepalive)
    pub ping_interval: Option<Duration>,
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_interval: Some(Duration::from_secs(30)),
        }
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Option<Duration>) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Inbound application frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text message
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Normalize either frame kind to raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            WsMessage::Text(text) => text.into_bytes(),
            WsMessage::Binary(data) => data,
        }
    }
}

/// WebSocket errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WsError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
    /// Keepalive ping went unanswered
    #[error("Pong timeout")]
    PongTimeout,
    /// A session is already running on this client
    #[error("Already connected")]
    AlreadyConnected,
    /// The store stopped accepting updates
    #[error("Price store closed")]
    StoreClosed,
}
