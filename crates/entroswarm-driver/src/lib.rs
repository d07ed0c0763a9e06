//! # Entroswarm Driver
//!
//! Wires the search controller to the outside world.
//!
//! ## Run
//!
//! ```text
//! load config → clear work dir → provision agent folders → build swarm
//!     → spawn / settle / configure / load initial snapshot
//!     → one round per tick until Ctrl-C or the round limit
//!     → teardown → write metrics
//! ```

pub mod config;
pub mod infra;
pub mod keys;
pub mod tick_driver;
pub mod workspace;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use entroswarm_darwinian::telemetry::SwarmMetrics;
use entroswarm_darwinian::{
    AgentDescriptor, CancellationFlag, Environment, SimulatedEnvironment, SwarmController,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{info, warn};

pub use config::DriverConfig;
pub use infra::ProcessEnvironment;
pub use tick_driver::{TickDriver, TickSummary};
pub use workspace::{AgentWorkspace, WorkDir};

/// Driver version
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the swarm. Simulated agents need no folders; process agents get
/// one provisioned under `work_dir`.
pub fn build_controller(config: &DriverConfig, work_dir: &WorkDir) -> Result<SwarmController> {
    let swarm_config = config.swarm_config()?;
    let key_pool = keys::resolve_key_pool(config.reference.key_pool.as_deref())?;

    let controller = SwarmController::new(swarm_config, key_pool, |descriptor: &AgentDescriptor| {
        if config.simulate {
            let environment = SimulatedEnvironment::new(descriptor.name.clone());
            return Ok(Box::new(environment) as Box<dyn Environment>);
        }
        let workspace = work_dir.provision(&descriptor.name, &config.reference)?;
        Ok(Box::new(ProcessEnvironment::new(
            descriptor.name.clone(),
            workspace,
            config.process.clone(),
        )) as Box<dyn Environment>)
    })?;
    Ok(controller)
}

fn initial_snapshot(config: &DriverConfig) -> Result<Option<Bytes>> {
    if config.simulate {
        return Ok(None);
    }
    match &config.reference.initial_snapshot {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading initial snapshot {}", path.display()))?;
            Ok(Some(Bytes::from(bytes)))
        }
        None => Ok(None),
    }
}

/// Text exposition of the swarm metrics
pub fn write_metrics(metrics: &SwarmMetrics, path: &Path) -> Result<()> {
    let registry = Registry::new();
    metrics.register(&registry)?;

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    std::fs::write(path, buffer)?;
    info!(path = %path.display(), "Wrote metrics");
    Ok(())
}

/// Run the swarm until `cancel` is raised or the round limit is reached.
/// Environments are torn down even when a round fails.
pub async fn run(config: DriverConfig, cancel: CancellationFlag) -> Result<TickSummary> {
    let work_dir = WorkDir::prepare(&config.work_dir)?;
    let mut controller = build_controller(&config, &work_dir)?;
    let initial = initial_snapshot(&config)?;

    let driver = TickDriver::new(Duration::from_millis(config.tick_interval_ms))
        .with_max_rounds(config.max_rounds);

    let outcome = match controller.start(initial).await {
        Ok(()) => driver.run(&mut controller, &cancel).await,
        Err(e) => Err(e),
    };

    if let Err(e) = controller.teardown().await {
        warn!(error = %e, "Teardown incomplete");
    }

    if let Some(path) = &config.metrics_path {
        write_metrics(&controller.metrics(), path)?;
    }

    let summary = outcome?;
    info!(
        rounds = summary.rounds_finalized,
        attempts = summary.attempts,
        record = controller.best_record_ever(),
        "Swarm stopped"
    );
    Ok(summary)
}
