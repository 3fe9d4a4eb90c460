//! Single writer task for the price store

use super::state::StoreState;
use super::types::{Quote, StoreEvent, TradeUpdate, UpdateOutcome};
use crate::telemetry::{self, GaugeMetric};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// Mutation requests accepted by the writer
pub(crate) enum StoreCommand {
    /// Apply one frame's updates in order
    Apply {
        updates: Vec<TradeUpdate>,
        reply: oneshot::Sender<Vec<UpdateOutcome>>,
    },
    /// Publish bootstrap quotes
    Seed {
        quotes: Vec<Quote>,
        reply: oneshot::Sender<usize>,
    },
}

/// Drain commands until every handle has been dropped
pub(crate) async fn run_writer(
    mut rx: mpsc::Receiver<StoreCommand>,
    state: Arc<RwLock<StoreState>>,
    events: broadcast::Sender<StoreEvent>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            StoreCommand::Apply { updates, reply } => {
                let outcomes = apply_updates(&state, &events, &updates).await;
                let _ = reply.send(outcomes);
            }
            StoreCommand::Seed { quotes, reply } => {
                let applied = seed_quotes(&state, &events, &quotes).await;
                let _ = reply.send(applied);
            }
        }
    }

    tracing::debug!("Price store writer shutting down");
}

async fn apply_updates(
    state: &RwLock<StoreState>,
    events: &broadcast::Sender<StoreEvent>,
    updates: &[TradeUpdate],
) -> Vec<UpdateOutcome> {
    let mut outcomes = Vec::with_capacity(updates.len());
    let mut changed = Vec::new();
    let priced;

    {
        let mut guard = state.write().await;
        for update in updates {
            let now = Utc::now();
            let outcome = guard.apply_update(&update.symbol, update.price, now);
            if outcome == UpdateOutcome::Changed {
                changed.push(StoreEvent::QuoteChanged {
                    symbol: update.symbol.clone(),
                    price: update.price,
                    timestamp: now,
                });
            }
            outcomes.push(outcome);
        }
        priced = priced_count(guard.quotes());
    }

    for (update, outcome) in updates.iter().zip(&outcomes) {
        telemetry::record_update(*outcome);
        if *outcome == UpdateOutcome::Rejected {
            tracing::debug!(symbol = %update.symbol, "Ignoring update for untracked symbol");
        }
    }
    telemetry::set_gauge(GaugeMetric::PricedQuotes, priced as f64);

    for event in changed {
        // No subscribers is fine
        let _ = events.send(event);
    }

    outcomes
}

async fn seed_quotes(
    state: &RwLock<StoreState>,
    events: &broadcast::Sender<StoreEvent>,
    quotes: &[Quote],
) -> usize {
    let now = Utc::now();
    let (applied, priced) = {
        let mut guard = state.write().await;
        let applied = guard.seed(quotes);
        (applied, priced_count(guard.quotes()))
    };

    let count = applied.len();
    tracing::info!(
        received = quotes.len(),
        applied = count,
        "Seeded bootstrap quotes"
    );
    telemetry::set_gauge(GaugeMetric::PricedQuotes, priced as f64);

    for (symbol, price) in applied {
        let _ = events.send(StoreEvent::QuoteChanged {
            symbol,
            price,
            timestamp: now,
        });
    }
    let _ = events.send(StoreEvent::Seeded { applied: count });

    count
}

fn priced_count(quotes: &[Quote]) -> usize {
    quotes.iter().filter(|q| q.price.is_some()).count()
}
