//! Skrive CLI entry point.

use anyhow::Result;
use clap::Parser;
use skrive::cli::{commands, Cli, Commands, Output};
use skrive::config::Settings;
use skrive::pipeline::PublishOverrides;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("skrive={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ctrl-C stops the run between requests
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                Output::warning("Interrupted, stopping after the current request...");
                cancel.cancel();
            }
        });
    }

    // Execute command
    match cli.command {
        Commands::Notes { input, provider, output, publish, dequeue } => {
            commands::run_notes(&input, provider, output, publish, dequeue, settings, cancel).await?;
        }

        Commands::Publish { notes_file, id, title, channel, duration } => {
            let overrides = PublishOverrides { id, title, channel, duration };
            commands::run_publish(&notes_file, overrides, settings).await?;
        }

        Commands::Queue { action } => {
            commands::run_queue(&action, settings, cancel).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
