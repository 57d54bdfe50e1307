//! Velov Beat - process entry point
//!
//! Loads `.env` and the YAML configuration, wires the HTTP fetcher and the configured sink
//! into a `Collector`, and stops it on Ctrl-C (or SIGTERM on Unix).

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use velov_beat::{sink, BeatConfig, Collector, HttpFetcher, StopHandle};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("velov_beat=info")))
        .init();

    let config = BeatConfig::load().await.context("Failed to load configuration")?;

    let source = HttpFetcher::new(&config.api).context("Failed to create HTTP fetcher")?;
    info!(url = %source.display_url(), "polling station endpoint");

    let sink = sink::from_config(&config.sink);
    let mut collector =
        Collector::new(config.period, Box::new(source), sink).context("Failed to create collector")?;

    tokio::spawn(stop_on_signal(collector.stop_handle()));

    collector.run().await.context("Collector execution failed")?;
    Ok(())
}

async fn stop_on_signal(stop: StopHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
    stop.stop();
}
