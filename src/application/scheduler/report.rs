//! Sweep outcome counters and the busy-retry helper shared by the sweeps.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::domain::membership::MembershipError;

/// Per-user outcomes of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    /// Users whose subscription changed.
    pub applied: usize,
    pub unchanged: usize,
    /// Users still locked after every retry; picked up next cycle.
    pub skipped_busy: usize,
    pub failed: usize,
}

impl SweepReport {
    pub(crate) fn record<T>(&mut self, outcome: &Result<Option<T>, MembershipError>) {
        self.examined += 1;
        match outcome {
            Ok(Some(_)) => self.applied += 1,
            Ok(None) => self.unchanged += 1,
            Err(MembershipError::Busy(_)) => self.skipped_busy += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: SweepReport) {
        self.examined += other.examined;
        self.applied += other.applied;
        self.unchanged += other.unchanged;
        self.skipped_busy += other.skipped_busy;
        self.failed += other.failed;
    }
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpirySweepReport {
    pub renewals_due: SweepReport,
    pub expirations: SweepReport,
}

/// Busy-retry policy for sweep operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyRetry {
    pub attempts: u32,
    pub backoff: Duration,
}

impl BusyRetry {
    /// Runs `op`, retrying `Busy` with linear backoff. Any other outcome,
    /// or `Busy` after the last retry, is returned as is.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, MembershipError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MembershipError>>,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Err(MembershipError::Busy(user_id)) if retries < self.attempts => {
                    retries += 1;
                    tracing::debug!(user_id = %user_id, retry = retries, "User busy; retrying");
                    tokio::time::sleep(self.backoff * retries).await;
                }
                outcome => return outcome,
            }
        }
    }
}
