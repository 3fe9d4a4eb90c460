//! Stream client types

use crate::ws::WsError;
use serde::Serialize;

/// Lifecycle of the streaming connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
    Receiving,
}

impl ConnectionState {
    /// Numeric form for the connection-state gauge
    pub fn as_gauge(&self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connecting => 1.0,
            ConnectionState::Subscribed => 2.0,
            ConnectionState::Receiving => 3.0,
        }
    }
}

/// Why a receive loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamExit {
    /// `disconnect()` was called
    Requested,
    /// The server closed the connection
    Closed,
    /// Transport error, keepalive timeout or store shutdown
    Failed(WsError),
}

impl StreamExit {
    /// Whether a supervisor should try to reconnect after this exit
    pub fn is_recoverable(&self) -> bool {
        match self {
            StreamExit::Requested => false,
            StreamExit::Closed => true,
            StreamExit::Failed(WsError::StoreClosed) => false,
            StreamExit::Failed(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_values_follow_lifecycle() {
        assert_eq!(ConnectionState::Disconnected.as_gauge(), 0.0);
        assert!(ConnectionState::Connecting.as_gauge() < ConnectionState::Subscribed.as_gauge());
        assert!(ConnectionState::Subscribed.as_gauge() < ConnectionState::Receiving.as_gauge());
    }

    #[test]
    fn test_recoverable_exits() {
        assert!(!StreamExit::Requested.is_recoverable());
        assert!(StreamExit::Closed.is_recoverable());
        assert!(StreamExit::Failed(WsError::PongTimeout).is_recoverable());
        assert!(!StreamExit::Failed(WsError::StoreClosed).is_recoverable());
    }
}
