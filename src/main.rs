use anyhow::Context;
use clap::Parser;
use quote_stream::cli::{Cli, Commands};
use quote_stream::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)
        .with_context(|| format!("Could not load config from {}", cli.config))?;

    // Initialize telemetry
    quote_stream::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(symbols = config.symbols.len(), "Starting price stream");
            args.execute(&config).await?;
        }
        Commands::Snapshot(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Symbols: {}", config.symbols.join(", "));
            println!("  Token: {}", config.api.masked_token());
            println!("  Quote URL: {}", config.api.quote_url);
            println!("  Stream URL: {}", config.api.stream_url);
            println!(
                "  Store: history={} commands={} events={}",
                config.store.max_history_samples,
                config.store.command_buffer,
                config.store.event_buffer
            );
            println!(
                "  Stream: ping={:?} reconnect={}",
                config.stream.ping_interval(),
                config.stream.reconnect.enabled
            );
            println!(
                "  Telemetry: level={} format={:?} metrics_port={:?}",
                config.telemetry.log_level,
                config.telemetry.log_format,
                config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
