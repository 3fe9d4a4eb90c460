//! WebSocket transport: connect, send, receive with keepalive, close

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Append the auth token to an endpoint as a `token` query parameter
pub fn authenticated_url(endpoint: &str, token: &str) -> Result<String, WsError> {
    reqwest::Url::parse_with_params(endpoint, &[("token", token)])
        .map(String::from)
        .map_err(|e| WsError::ConnectionFailed(format!("invalid url {}: {}", endpoint, e)))
}

/// WebSocket client that opens one connection per `connect` call
///
/// Reconnection is left to the caller.
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Open the connection
    pub async fn connect(&self) -> Result<WsConnection, WsError> {
        tracing::debug!("Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&self.config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        let (write, read) = ws_stream.split();

        let ping = self.config.ping_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        tracing::debug!("WebSocket connected");

        Ok(WsConnection {
            write,
            read,
            ping,
            waiting_for_pong: false,
        })
    }
}

/// An open WebSocket connection
pub struct WsConnection {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    ping: Option<Interval>,
    waiting_for_pong: bool,
}

impl WsConnection {
    /// Send one text message
    pub async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        self.write
            .send(Message::Text(text))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    /// Wait for the next application frame
    ///
    /// Control frames are handled here. Returns `Ok(None)` once the peer
    /// closes the connection. Cancel safe.
    pub async fn next_message(&mut self) -> Result<Option<WsMessage>, WsError> {
        loop {
            tokio::select! {
                msg = self.read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => return Ok(Some(WsMessage::Text(text))),
                        Some(Ok(Message::Binary(data))) => return Ok(Some(WsMessage::Binary(data))),
                        Some(Ok(Message::Ping(data))) => {
                            self.write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(frame = ?frame, "Received close frame");
                            return Ok(None);
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Ok(None);
                        }
                    }
                }

                _ = next_ping(&mut self.ping) => {
                    if self.waiting_for_pong {
                        return Err(WsError::PongTimeout);
                    }
                    self.write.send(Message::Ping(Vec::new())).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    self.waiting_for_pong = true;
                }
            }
        }
    }

    /// Send a normal-closure close frame and shut the sink
    pub async fn close(mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if let Err(e) = self.write.send(Message::Close(Some(frame))).await {
            tracing::debug!(error = %e, "Failed to send close frame");
        }
        if let Err(e) = self.write.close().await {
            tracing::debug!(error = %e, "Failed to close WebSocket sink");
        }
    }
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
