//! Run command implementation

use crate::bootstrap::{HttpQuoteSource, QuoteBootstrapper};
use crate::config::Config;
use crate::feed::{StreamClient, StreamClientConfig, StreamSupervisor, SupervisorExit};
use crate::store::{PriceStore, PriceStoreHandle, StoreEvent};
use anyhow::Context;
use clap::Args;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip the initial REST snapshot
    #[arg(long)]
    pub skip_bootstrap: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PriceStore::spawn(&config.symbols, &config.store);
        let shutdown = CancellationToken::new();

        let events = tokio::spawn(log_events(store.subscribe(), shutdown.clone()));

        let client = StreamClient::new(
            StreamClientConfig::from_config(config),
            config.symbols.clone(),
            store.clone(),
        )
        .context("Invalid stream endpoint")?;
        let supervisor = StreamSupervisor::new(client, &config.stream.reconnect);
        let mut stream = tokio::spawn(supervisor.run(shutdown.clone()));

        if !self.skip_bootstrap {
            let source =
                HttpQuoteSource::from_config(&config.api).context("Failed to build quote client")?;
            let symbols = config.symbols.clone();
            let bootstrap_store = store.clone();
            tokio::spawn(async move {
                if let Err(e) = QuoteBootstrapper::new(source)
                    .run(&symbols, &bootstrap_store)
                    .await
                {
                    tracing::error!(error = %e, "Bootstrap could not publish quotes");
                }
            });
        }

        let deadline = self.duration_secs.map(Duration::from_secs);
        let exit = tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutdown requested");
                shutdown.cancel();
                stream.await?
            }
            _ = sleep_or_forever(deadline) => {
                tracing::info!("Run duration elapsed");
                shutdown.cancel();
                stream.await?
            }
            exit = &mut stream => exit?,
        };
        shutdown.cancel();
        let _ = events.await;

        report(&store).await;

        match exit {
            SupervisorExit::GaveUp { attempts } => {
                anyhow::bail!("Trade stream unavailable after {} reconnect attempts", attempts)
            }
            exit => {
                tracing::info!(exit = ?exit, "Stopped");
                Ok(())
            }
        }
    }
}

async fn sleep_or_forever(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Log every store event until shutdown
async fn log_events(mut events: broadcast::Receiver<StoreEvent>, shutdown: CancellationToken) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(StoreEvent::QuoteChanged { symbol, price, .. }) => {
                tracing::info!(symbol = %symbol, price = %price, "Price updated");
            }
            Ok(StoreEvent::Seeded { applied }) => {
                tracing::info!(applied, "Initial quotes published");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn report(store: &PriceStoreHandle) {
    let snapshot = store.snapshot().await;
    for quote in &snapshot.quotes {
        let samples = snapshot.history_for(&quote.symbol).len();
        match quote.price {
            Some(price) => tracing::info!(symbol = %quote.symbol, price = %price, samples, "Final quote"),
            None => tracing::info!(symbol = %quote.symbol, samples, "Final quote (no price)"),
        }
    }
}
