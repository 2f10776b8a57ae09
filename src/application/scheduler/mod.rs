//! Periodic jobs: the expiry sweep and the tier re-evaluation sweep.
//!
//! # Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `tier_evaluation_interval` | 6h | Time between tier sweeps |
//! | `expiry_sweep_interval` | 300s | Time between expiry sweeps |
//! | `evaluation_batch_size` | 100 | Subscriptions read per page |
//! | `max_concurrent_tier_evaluations` | 10 | Users processed at once |
//! | `busy_retry_attempts` | 3 | Retries for a locked user |
//! | `busy_retry_backoff` | 50ms | Linear backoff step between retries |
//!
//! Both sweeps go through the same handlers as user requests, so they take
//! the same per-user locks and never race a concurrent lifecycle operation.

mod expiry_sweep;
mod report;
mod tier_sweep;

pub use expiry_sweep::ExpirySweep;
pub use report::{BusyRetry, ExpirySweepReport, SweepReport};
pub use tier_sweep::TierEvaluationSweep;

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::config::EngineConfig;

use super::HandlerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub tier_evaluation_interval: Duration,
    pub expiry_sweep_interval: Duration,
    pub evaluation_batch_size: usize,
    pub max_concurrent_tier_evaluations: usize,
    pub busy_retry_attempts: u32,
    pub busy_retry_backoff: Duration,
}

impl SchedulerSettings {
    pub fn from_config(engine: &EngineConfig) -> Self {
        Self {
            tier_evaluation_interval: Duration::from_secs(
                engine.tier_evaluation_interval_hours * 3600,
            ),
            expiry_sweep_interval: Duration::from_secs(engine.expiry_sweep_interval_secs),
            evaluation_batch_size: engine.evaluation_batch_size.max(1),
            max_concurrent_tier_evaluations: engine.max_concurrent_tier_evaluations.max(1),
            busy_retry_attempts: engine.busy_retry_attempts,
            busy_retry_backoff: Duration::from_millis(engine.busy_retry_backoff_ms),
        }
    }

    pub fn busy_retry(&self) -> BusyRetry {
        BusyRetry {
            attempts: self.busy_retry_attempts,
            backoff: self.busy_retry_backoff,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tier_evaluation_interval: Duration::from_secs(6 * 3600),
            expiry_sweep_interval: Duration::from_secs(300),
            evaluation_batch_size: 100,
            max_concurrent_tier_evaluations: 10,
            busy_retry_attempts: 3,
            busy_retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Runs both sweeps on their own intervals until shutdown.
pub struct MembershipScheduler {
    expiry: ExpirySweep,
    tiers: TierEvaluationSweep,
    settings: SchedulerSettings,
}

impl MembershipScheduler {
    pub fn new(ctx: HandlerContext, settings: SchedulerSettings) -> Self {
        Self {
            expiry: ExpirySweep::new(ctx.clone(), settings),
            tiers: TierEvaluationSweep::new(ctx, settings),
            settings,
        }
    }

    pub fn expiry_sweep(&self) -> &ExpirySweep {
        &self.expiry
    }

    pub fn tier_sweep(&self) -> &TierEvaluationSweep {
        &self.tiers
    }

    /// Loops until `shutdown` flips to true. Both sweeps fire once at start.
    ///
    /// A sweep that cannot read the repository is logged and retried on its
    /// next tick; it never stops the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut expiry_tick = time::interval(self.settings.expiry_sweep_interval);
        let mut tier_tick = time::interval(self.settings.tier_evaluation_interval);
        expiry_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tier_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            expiry_every_secs = self.settings.expiry_sweep_interval.as_secs(),
            tiers_every_secs = self.settings.tier_evaluation_interval.as_secs(),
            "Membership scheduler started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Membership scheduler stopping");
                        return;
                    }
                }

                _ = expiry_tick.tick() => {
                    if let Err(err) = self.expiry.run_once().await {
                        tracing::error!(error = %err, "Expiry sweep aborted");
                    }
                }

                _ = tier_tick.tick() => {
                    if let Err(err) = self.tiers.run_once().await {
                        tracing::error!(error = %err, "Tier evaluation sweep aborted");
                    }
                }
            }
        }
    }
}
