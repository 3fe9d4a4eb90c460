//! Price store types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current best-known price for a tracked symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Instrument identifier (e.g., "BINANCE:BTCUSDT")
    pub symbol: String,
    /// Last known price, absent until first data arrives
    pub price: Option<Decimal>,
}

impl Quote {
    /// Create a quote with no price yet
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price: None,
        }
    }

    /// Create a quote with a known price
    pub fn priced(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price: Some(price),
        }
    }
}

/// A single timestamped price sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Local time the update was applied
    pub timestamp: DateTime<Utc>,
    /// Sampled price
    pub price: Decimal,
}

/// A (symbol, price) intent produced by the stream decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub symbol: String,
    pub price: Decimal,
}

impl TradeUpdate {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

/// Result of applying one update to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Quote price replaced and a notification emitted
    Changed,
    /// Price equal to the stored one; history appended only
    Unchanged,
    /// Symbol is not tracked; nothing recorded
    Rejected,
}

impl UpdateOutcome {
    /// Label used for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Changed => "changed",
            UpdateOutcome::Unchanged => "unchanged",
            UpdateOutcome::Rejected => "rejected",
        }
    }
}

/// Change notification broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A tracked symbol's quote price changed
    QuoteChanged {
        symbol: String,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Bootstrap quotes were published; `applied` quotes received a price
    Seeded { applied: usize },
}

/// Point-in-time copy of the whole store
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// One quote per tracked symbol, in configured order
    pub quotes: Vec<Quote>,
    /// History per tracked symbol, oldest first
    pub history: HashMap<String, Vec<PricePoint>>,
}

impl StoreSnapshot {
    /// History for a symbol, empty if none recorded
    pub fn history_for(&self, symbol: &str) -> &[PricePoint] {
        self.history.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}
