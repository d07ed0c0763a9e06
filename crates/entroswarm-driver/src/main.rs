//! Entroswarm binary
//!
//! Entropy-driven save-state exploration over a swarm of frontends

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use entroswarm_darwinian::CancellationFlag;
use entroswarm_driver::{DriverConfig, DRIVER_VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Entroswarm v{}", DRIVER_VERSION);

    let config = DriverConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                on_signal.cancel();
            }
            Err(e) => error!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });

    let summary = entroswarm_driver::run(config, cancel).await?;
    info!(
        "Shutting down Entroswarm after {} rounds ({} attempts)",
        summary.rounds_finalized, summary.attempts
    );
    Ok(())
}
