//! Streaming trade client
//!
//! Owns one WebSocket session at a time:
//! `Disconnected -> Connecting -> Subscribed -> Receiving -> Disconnected`.
//! The receive loop reads one frame, decodes it and applies the updates to
//! the store before reading the next. It never reconnects on its own; the
//! exit reason is reported through [`StreamClient::wait`].

use super::decoder::decode_frame;
use super::types::{ConnectionState, StreamExit};
use crate::config::Config;
use crate::store::PriceStoreHandle;
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use crate::ws::{authenticated_url, WsClient, WsConfig, WsConnection, WsError, WsMessage};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Stream client configuration
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Streaming endpoint without the token
    pub url: String,
    /// Auth token appended as `?token=`
    pub token: String,
    /// Keepalive ping interval (None disables keepalive)
    pub ping_interval: Option<Duration>,
}

impl StreamClientConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            ping_interval: Some(Duration::from_secs(30)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.api.stream_url.clone(),
            token: config.api.token.clone(),
            ping_interval: config.stream.ping_interval(),
        }
    }

    pub fn ping_interval(mut self, d: Option<Duration>) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Outbound subscribe control message
#[derive(Debug, Serialize)]
struct SubscribeMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    symbol: &'a str,
}

/// Build the subscribe message for one symbol
pub(crate) fn subscribe_message(symbol: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SubscribeMessage {
        msg_type: "subscribe",
        symbol,
    })
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<StreamExit>,
}

/// Streaming connection feeding the price store
pub struct StreamClient {
    ws: WsClient,
    symbols: Vec<String>,
    store: PriceStoreHandle,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Option<Session>,
}

impl StreamClient {
    /// Create a disconnected client for the given symbols
    pub fn new(
        config: StreamClientConfig,
        symbols: Vec<String>,
        store: PriceStoreHandle,
    ) -> Result<Self, WsError> {
        let url = authenticated_url(&config.url, &config.token)?;
        let ws = WsClient::new(WsConfig::new(url).ping_interval(config.ping_interval));
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            ws,
            symbols,
            store,
            state: Arc::new(state),
            session: None,
        })
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every connection state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Open the connection, subscribe every symbol and start receiving
    ///
    /// Returns once the receive loop is running. Subscribe failures are
    /// logged and do not fail the connect.
    pub async fn connect(&mut self) -> Result<(), WsError> {
        if let Some(session) = &self.session {
            if !session.task.is_finished() {
                return Err(WsError::AlreadyConnected);
            }
        }
        self.session = None;

        publish_state(&self.state, ConnectionState::Connecting);
        tracing::info!(symbols = self.symbols.len(), "Connecting to trade stream");

        let mut conn = match self.ws.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Trade stream connection failed");
                publish_state(&self.state, ConnectionState::Disconnected);
                return Err(e);
            }
        };

        publish_state(&self.state, ConnectionState::Subscribed);
        subscribe_all(&mut conn, &self.symbols).await;

        publish_state(&self.state, ConnectionState::Receiving);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            conn,
            self.store.clone(),
            cancel.clone(),
            self.state.clone(),
        ));
        self.session = Some(Session { cancel, task });

        Ok(())
    }

    /// Wait for the current session's receive loop to end
    ///
    /// Returns None if no session is running. Cancel safe.
    pub async fn wait(&mut self) -> Option<StreamExit> {
        let session = self.session.as_mut()?;
        let exit = match (&mut session.task).await {
            Ok(exit) => exit,
            Err(e) => StreamExit::Failed(WsError::ConnectionFailed(format!(
                "receive task failed: {}",
                e
            ))),
        };
        self.session = None;
        Some(exit)
    }

    /// Stop the receive loop with a normal closure
    ///
    /// Waits for the loop to finish, so no store update from this session
    /// happens after it returns. Calling it again is a no-op.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            if self.state() != ConnectionState::Disconnected {
                publish_state(&self.state, ConnectionState::Disconnected);
            }
            return;
        };

        session.cancel.cancel();
        match session.task.await {
            Ok(exit) => tracing::info!(exit = ?exit, "Trade stream disconnected"),
            Err(e) => tracing::warn!(error = %e, "Receive task ended abnormally"),
        }
        publish_state(&self.state, ConnectionState::Disconnected);
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}

fn publish_state(tx: &watch::Sender<ConnectionState>, state: ConnectionState) {
    tx.send_replace(state);
    telemetry::set_gauge(GaugeMetric::ConnectionState, state.as_gauge());
    tracing::debug!(state = ?state, "Stream state changed");
}

/// Send one subscribe message per symbol; failures are logged only
async fn subscribe_all(conn: &mut WsConnection, symbols: &[String]) {
    for symbol in symbols {
        let message = match subscribe_message(symbol) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Failed to encode subscribe message");
                telemetry::increment(CounterMetric::SubscribeFailures);
                continue;
            }
        };

        match conn.send_text(message).await {
            Ok(()) => tracing::info!(symbol = %symbol, "Subscribed"),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Subscribe failed");
                telemetry::increment(CounterMetric::SubscribeFailures);
            }
        }
    }
}

enum Step {
    Cancelled,
    Message(Result<Option<WsMessage>, WsError>),
}

async fn receive_loop(
    mut conn: WsConnection,
    store: PriceStoreHandle,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
) -> StreamExit {
    let exit = loop {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Cancelled,
            msg = conn.next_message() => Step::Message(msg),
        };

        match step {
            Step::Cancelled => {
                conn.close().await;
                break StreamExit::Requested;
            }
            Step::Message(Ok(Some(msg))) => {
                if let Err(e) = process_frame(&store, msg).await {
                    tracing::error!(error = %e, "Price store rejected stream updates");
                    break StreamExit::Failed(WsError::StoreClosed);
                }
            }
            Step::Message(Ok(None)) => {
                tracing::warn!("Trade stream closed by server");
                break StreamExit::Closed;
            }
            Step::Message(Err(e)) => {
                tracing::warn!(error = %e, "Trade stream receive failed");
                break StreamExit::Failed(e);
            }
        }
    };

    publish_state(&state, ConnectionState::Disconnected);
    exit
}

/// Decode one frame and apply its updates before the next read
async fn process_frame(
    store: &PriceStoreHandle,
    msg: WsMessage,
) -> Result<(), crate::store::StoreError> {
    telemetry::increment(CounterMetric::FramesReceived);
    let started = Instant::now();

    let payload = msg.into_bytes();
    let updates = decode_frame(&payload);

    if updates.is_empty() {
        telemetry::increment(CounterMetric::FramesDropped);
        tracing::debug!(
            len = payload.len(),
            preview = %String::from_utf8_lossy(&payload[..payload.len().min(100)]),
            "Dropping frame with no trade updates"
        );
        return Ok(());
    }

    store.apply(updates).await?;
    telemetry::record_latency(LatencyMetric::FrameProcessing, started.elapsed());

    Ok(())
}
