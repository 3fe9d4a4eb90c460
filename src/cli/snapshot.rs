//! Snapshot command implementation

use crate::bootstrap::{HttpQuoteSource, QuoteBootstrapper};
use crate::config::Config;
use crate::store::Quote;
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl SnapshotArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let source =
            HttpQuoteSource::from_config(&config.api).context("Failed to build quote client")?;
        let quotes = QuoteBootstrapper::new(source)
            .fetch_initial_quotes(&config.symbols)
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&quotes)?);
        } else {
            print!("{}", format_table(&quotes));
        }
        Ok(())
    }
}

fn format_table(quotes: &[Quote]) -> String {
    let width = quotes
        .iter()
        .map(|q| q.symbol.len())
        .max()
        .unwrap_or(0)
        .max("SYMBOL".len());

    let mut out = format!("{:<width$}  PRICE\n", "SYMBOL", width = width);
    for quote in quotes {
        let price = quote
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{:<width$}  {}\n", quote.symbol, price, width = width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_table_marks_absent_prices() {
        let table = format_table(&[
            Quote::priced("BINANCE:BTCUSDT", dec!(64000.5)),
            Quote::empty("AAPL"),
        ]);
        assert_eq!(
            table,
            "SYMBOL           PRICE\nBINANCE:BTCUSDT  64000.5\nAAPL             -\n"
        );
    }
}
