//! Initial quote bootstrap
//!
//! Fetches a snapshot price for every symbol concurrently, waits for all of
//! them, then publishes the batch to the store in one seed. A failed fetch
//! leaves that symbol's price absent and never fails the batch.

mod http;

pub use http::HttpQuoteSource;

use crate::store::{PriceStoreHandle, Quote, StoreError};
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use async_trait::async_trait;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::time::Instant;
use thiserror::Error;

/// Errors from a single snapshot fetch
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Response has no current price")]
    MissingPrice,

    #[error("Current price is not a number: {0}")]
    InvalidPrice(String),
}

/// Source of point-in-time prices
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, BootstrapError>;
}

/// Concurrent fan-out/fan-in of snapshot requests
pub struct QuoteBootstrapper<S> {
    source: S,
}

impl<S: QuoteSource> QuoteBootstrapper<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch one quote per symbol, in the order given
    ///
    /// All requests are in flight at once and the call returns only after
    /// every one has completed or failed.
    pub async fn fetch_initial_quotes(&self, symbols: &[String]) -> Vec<Quote> {
        let started = Instant::now();
        let quotes = join_all(symbols.iter().map(|symbol| self.fetch_one(symbol))).await;

        let priced = quotes.iter().filter(|q| q.price.is_some()).count();
        tracing::info!(
            symbols = symbols.len(),
            priced,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Initial quotes fetched"
        );
        quotes
    }

    /// Fetch the initial quotes and seed them into the store
    ///
    /// Returns the fetched quotes; the store only fills symbols that have
    /// no price yet.
    pub async fn run(
        &self,
        symbols: &[String],
        store: &PriceStoreHandle,
    ) -> Result<Vec<Quote>, StoreError> {
        let quotes = self.fetch_initial_quotes(symbols).await;
        let applied = store.seed(quotes.clone()).await?;
        tracing::info!(applied, "Store seeded from snapshot");
        Ok(quotes)
    }

    async fn fetch_one(&self, symbol: &str) -> Quote {
        let started = Instant::now();
        let result = self.source.fetch_price(symbol).await;
        telemetry::record_latency(LatencyMetric::BootstrapRequest, started.elapsed());

        match result {
            Ok(price) => {
                telemetry::increment(CounterMetric::BootstrapSuccess);
                tracing::debug!(symbol = %symbol, price = %price, "Fetched initial quote");
                Quote::priced(symbol, price)
            }
            Err(e) => {
                telemetry::increment(CounterMetric::BootstrapFailure);
                tracing::warn!(symbol = %symbol, error = %e, "Initial quote fetch failed");
                Quote::empty(symbol)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::{PriceStore, StoreEvent};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    struct MockSource {
        prices: HashMap<String, Decimal>,
        delays: HashMap<String, Duration>,
    }

    impl MockSource {
        fn new(prices: &[(&str, Decimal)]) -> Self {
            Self {
                prices: prices
                    .iter()
                    .map(|(s, p)| (s.to_string(), *p))
                    .collect(),
                delays: HashMap::new(),
            }
        }

        fn delay(mut self, symbol: &str, delay: Duration) -> Self {
            self.delays.insert(symbol.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl QuoteSource for MockSource {
        async fn fetch_price(&self, symbol: &str) -> Result<Decimal, BootstrapError> {
            if let Some(delay) = self.delays.get(symbol) {
                tokio::time::sleep(*delay).await;
            }
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| BootstrapError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
        }
    }

    /// Every request blocks until all of them have started
    struct RendezvousSource {
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl QuoteSource for RendezvousSource {
        async fn fetch_price(&self, _symbol: &str) -> Result<Decimal, BootstrapError> {
            self.barrier.wait().await;
            Ok(dec!(1))
        }
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failures_leave_price_absent() {
        let bootstrapper =
            QuoteBootstrapper::new(MockSource::new(&[("BTCUSDT", dec!(100)), ("GBPUSD", dec!(50))]));

        let quotes = bootstrapper
            .fetch_initial_quotes(&symbols(&["BTCUSDT", "ETHUSDT", "GBPUSD"]))
            .await;

        assert_eq!(
            quotes,
            vec![
                Quote::priced("BTCUSDT", dec!(100)),
                Quote::empty("ETHUSDT"),
                Quote::priced("GBPUSD", dec!(50)),
            ]
        );
    }

    #[tokio::test]
    async fn test_output_follows_input_order_not_completion_order() {
        let source = MockSource::new(&[("A", dec!(1)), ("B", dec!(2)), ("C", dec!(3))])
            .delay("A", Duration::from_millis(50))
            .delay("B", Duration::from_millis(20));
        let quotes = QuoteBootstrapper::new(source)
            .fetch_initial_quotes(&symbols(&["A", "B", "C"]))
            .await;

        let order: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(order, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_requests_run_concurrently() {
        let names = symbols(&["A", "B", "C", "D"]);
        let source = RendezvousSource {
            barrier: Arc::new(Barrier::new(names.len())),
        };

        let quotes = tokio::time::timeout(
            Duration::from_secs(5),
            QuoteBootstrapper::new(source).fetch_initial_quotes(&names),
        )
        .await
        .expect("requests were not issued concurrently");

        assert!(quotes.iter().all(|q| q.price == Some(dec!(1))));
    }

    #[tokio::test]
    async fn test_empty_symbol_list() {
        let quotes = QuoteBootstrapper::new(MockSource::new(&[]))
            .fetch_initial_quotes(&[])
            .await;
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn test_run_seeds_store_once() {
        let names = symbols(&["BTCUSDT", "ETHUSDT", "GBPUSD"]);
        let store = PriceStore::spawn(&names, &StoreConfig::default());
        let mut events = store.subscribe();

        let bootstrapper =
            QuoteBootstrapper::new(MockSource::new(&[("BTCUSDT", dec!(100)), ("GBPUSD", dec!(50))]));
        bootstrapper.run(&names, &store).await.unwrap();

        assert_eq!(
            store.quotes().await,
            vec![
                Quote::priced("BTCUSDT", dec!(100)),
                Quote::empty("ETHUSDT"),
                Quote::priced("GBPUSD", dec!(50)),
            ]
        );
        assert!(store.history("BTCUSDT").await.is_empty());

        let mut seeded = None;
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::Seeded { applied } = event {
                seeded = Some(applied);
            }
        }
        assert_eq!(seeded, Some(2));
    }
}
