//! Membership engine worker
//!
//! Runs the periodic jobs against the in-memory adapters:
//! - Expiry sweep (every `expiry_sweep_interval_secs`)
//! - Tier re-evaluation sweep (every `tier_evaluation_interval_hours`)
//!
//! Stops gracefully on Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use membership_engine::adapters::SystemClock;
use membership_engine::bootstrap::InMemoryEngine;
use membership_engine::config::{init_tracing, AppConfig};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load_validated() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("membership-engine: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("membership-engine: {e}");
        return ExitCode::FAILURE;
    }

    info!(environment = ?config.logging.environment, "Starting membership engine worker");

    let engine = match InMemoryEngine::build(&config, Arc::new(SystemClock)).await {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Failed to start membership engine");
            return ExitCode::FAILURE;
        }
    };

    let scheduler = engine.service.scheduler(engine.scheduler_settings);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    if let Err(e) = worker.await {
        error!(error = %e, "Scheduler task ended abnormally");
        return ExitCode::FAILURE;
    }

    info!("Membership engine worker stopped");
    ExitCode::SUCCESS
}
