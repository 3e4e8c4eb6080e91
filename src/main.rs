//! AlertRelay - Notification Dispatch Gateway
//!
//! Accepts alert events over HTTP and forwards them to the push provider.

use alertrelay::{app::App, cli::Cli, config::Config};
use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            // Initialize a default subscriber just to report this error.
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("AlertRelay starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_address);
    info!("Provider URL: {}", config.provider.api_url);
    info!("Provider App ID: {}", config.provider.app_id);
    info!(
        "Provider Timeout: {}",
        config
            .provider
            .timeout_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "client default".to_string())
    );
    info!(
        "Dry Run: {}",
        if config.provider.dry_run { "Enabled" } else { "Disabled" }
    );
    info!(
        "Metrics Endpoint: {}",
        if config.metrics.enabled { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;
    info!("AlertRelay ready on {}", app.local_addr());

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutdown signal received. Shutting down gracefully...");
        let _ = shutdown_tx.send(true);
    });

    app.run().await
}
