//! WebSocket client library
//!
//! Single-connection WebSocket transport with ping/pong keepalive, plus the
//! backoff policy used when a caller decides to reconnect.

mod client;
mod reconnect;
mod types;

pub use client::{authenticated_url, WsClient, WsConnection};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use types::{WsConfig, WsError, WsMessage};
