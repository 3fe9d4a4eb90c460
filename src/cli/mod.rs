//! CLI interface for quote-stream
//!
//! Provides subcommands for:
//! - `run`: Bootstrap prices and stream live trades into the store
//! - `snapshot`: Fetch one REST snapshot per symbol and print it
//! - `config`: Show the effective configuration

mod run;
mod snapshot;

pub use run::RunArgs;
pub use snapshot::SnapshotArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "quote-stream")]
#[command(about = "Near-real-time price ingestion from a trade stream")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap and stream live prices
    Run(RunArgs),
    /// Fetch and print initial quotes only
    Snapshot(SnapshotArgs),
    /// Show configuration
    Config,
}
