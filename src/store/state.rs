//! Quote table and bounded per-symbol history
//!
//! Plain data with no synchronization. Only the writer task mutates it.

use super::types::{PricePoint, Quote, StoreSnapshot, UpdateOutcome};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// Mutable store contents
#[derive(Debug)]
pub struct StoreState {
    quotes: Vec<Quote>,
    index: HashMap<String, usize>,
    history: HashMap<String, VecDeque<PricePoint>>,
    max_history: usize,
}

impl StoreState {
    /// Create state with one empty quote per tracked symbol
    ///
    /// Duplicate symbols are collapsed to their first occurrence.
    pub fn new(symbols: &[String], max_history: usize) -> Self {
        let max_history = max_history.max(1);
        let mut quotes = Vec::with_capacity(symbols.len());
        let mut index = HashMap::with_capacity(symbols.len());
        let mut history = HashMap::with_capacity(symbols.len());

        for symbol in symbols {
            if index.contains_key(symbol) {
                continue;
            }
            index.insert(symbol.clone(), quotes.len());
            history.insert(symbol.clone(), VecDeque::with_capacity(max_history));
            quotes.push(Quote::empty(symbol.clone()));
        }

        Self {
            quotes,
            index,
            history,
            max_history,
        }
    }

    /// Apply one stream update
    ///
    /// The quote only changes when the price differs; a history point is
    /// appended for every accepted update.
    pub fn apply_update(
        &mut self,
        symbol: &str,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> UpdateOutcome {
        let Some(&idx) = self.index.get(symbol) else {
            return UpdateOutcome::Rejected;
        };

        let quote = &mut self.quotes[idx];
        let outcome = if quote.price == Some(price) {
            UpdateOutcome::Unchanged
        } else {
            quote.price = Some(price);
            UpdateOutcome::Changed
        };

        if let Some(points) = self.history.get_mut(symbol) {
            if points.len() >= self.max_history {
                points.pop_front();
            }
            points.push_back(PricePoint {
                timestamp: now,
                price,
            });
        }

        outcome
    }

    /// Fill in bootstrap prices for quotes that have none yet
    ///
    /// Returns the (symbol, price) pairs actually written. Absent prices,
    /// untracked symbols and symbols already priced by the stream are skipped.
    pub fn seed(&mut self, quotes: &[Quote]) -> Vec<(String, Decimal)> {
        let mut applied = Vec::new();

        for incoming in quotes {
            let Some(price) = incoming.price else {
                continue;
            };
            let Some(&idx) = self.index.get(&incoming.symbol) else {
                continue;
            };
            let quote = &mut self.quotes[idx];
            if quote.price.is_none() {
                quote.price = Some(price);
                applied.push((incoming.symbol.clone(), price));
            }
        }

        applied
    }

    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// Tracked symbols in configured order
    pub fn symbols(&self) -> Vec<String> {
        self.quotes.iter().map(|q| q.symbol.clone()).collect()
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.index.get(symbol).map(|&idx| &self.quotes[idx])
    }

    /// Copy of a symbol's history, oldest first
    pub fn history(&self, symbol: &str) -> Vec<PricePoint> {
        self.history
            .get(symbol)
            .map(|points| points.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            quotes: self.quotes.clone(),
            history: self
                .history
                .iter()
                .map(|(symbol, points)| (symbol.clone(), points.iter().copied().collect()))
                .collect(),
        }
    }
}
