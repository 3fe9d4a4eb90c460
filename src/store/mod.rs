//! Price store module
//!
//! Process-wide quote table and bounded per-symbol history. All mutation
//! goes through one writer task; handles submit commands to it and readers
//! copy out of the shared state under a short read lock.

mod state;
mod types;
mod writer;

pub use state::StoreState;
pub use types::{PricePoint, Quote, StoreEvent, StoreSnapshot, TradeUpdate, UpdateOutcome};

use crate::config::StoreConfig;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use writer::StoreCommand;

/// Price store errors
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The writer task is gone; no further mutation is possible
    #[error("price store writer has shut down")]
    WriterClosed,
}

/// Entry point for creating the store
pub struct PriceStore;

impl PriceStore {
    /// Create the store for a fixed symbol set and start its writer task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(symbols: &[String], config: &StoreConfig) -> PriceStoreHandle {
        let state = Arc::new(RwLock::new(StoreState::new(
            symbols,
            config.max_history_samples,
        )));
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));

        let writer_state = state.clone();
        let writer_events = event_tx.clone();
        tokio::spawn(async move {
            writer::run_writer(command_rx, writer_state, writer_events).await;
        });

        tracing::info!(
            symbols = symbols.len(),
            max_history = config.max_history_samples,
            "Price store started"
        );

        PriceStoreHandle {
            commands: command_tx,
            state,
            events: event_tx,
        }
    }
}

/// Cloneable handle to the store
///
/// Mutations are serialized through the writer task and acknowledged once
/// applied. Reads never wait on the command queue.
#[derive(Clone)]
pub struct PriceStoreHandle {
    commands: mpsc::Sender<StoreCommand>,
    state: Arc<RwLock<StoreState>>,
    events: broadcast::Sender<StoreEvent>,
}

impl PriceStoreHandle {
    /// Apply a single (symbol, price) update
    pub async fn update(
        &self,
        symbol: impl Into<String>,
        price: Decimal,
    ) -> Result<UpdateOutcome, StoreError> {
        let outcomes = self.apply(vec![TradeUpdate::new(symbol, price)]).await?;
        outcomes
            .into_iter()
            .next()
            .ok_or(StoreError::WriterClosed)
    }

    /// Apply the updates decoded from one frame, in order, as one command
    pub async fn apply(&self, updates: Vec<TradeUpdate>) -> Result<Vec<UpdateOutcome>, StoreError> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Apply { updates, reply }).await?;
        rx.await.map_err(|_| StoreError::WriterClosed)
    }

    /// Publish bootstrap quotes; returns how many quotes received a price
    pub async fn seed(&self, quotes: Vec<Quote>) -> Result<usize, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Seed { quotes, reply }).await?;
        rx.await.map_err(|_| StoreError::WriterClosed)
    }

    /// Subscribe to change notifications; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Current quotes in configured symbol order
    pub async fn quotes(&self) -> Vec<Quote> {
        self.state.read().await.quotes().to_vec()
    }

    pub async fn quote(&self, symbol: &str) -> Option<Quote> {
        self.state.read().await.quote(symbol).cloned()
    }

    /// History for a symbol, oldest first; empty if none or untracked
    pub async fn history(&self, symbol: &str) -> Vec<PricePoint> {
        self.state.read().await.history(symbol)
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn tracked_symbols(&self) -> Vec<String> {
        self.state.read().await.symbols()
    }

    async fn send(&self, command: StoreCommand) -> Result<(), StoreError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| StoreError::WriterClosed)
    }
}
