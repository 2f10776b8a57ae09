//! Engine tuning: scheduling, concurrency, windows and limits

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use super::error::ValidationError;

/// Engine configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Hours between scheduled tier re-evaluation sweeps
    pub tier_evaluation_interval_hours: u64,

    /// Subscriptions read per sweep page
    pub evaluation_batch_size: usize,

    /// Upper bound on user locks the tier sweep holds at once
    pub max_concurrent_tier_evaluations: usize,

    /// Months of activity buckets kept per user
    pub activity_retention_months: u32,

    /// Calendar months counted towards `orders_in_window`
    pub order_window_months: u32,

    /// Largest accepted activity batch
    pub max_activity_batch_size: usize,

    /// How long a lifecycle operation waits for the user's lock
    pub lock_timeout_ms: u64,

    /// Days before expiry in which renewal opens
    pub renewal_window_days: u32,

    pub cancellation_reason_max_length: usize,

    /// Largest accepted single activity value
    pub max_activity_value: Decimal,

    /// Seconds between expiry sweeps
    pub expiry_sweep_interval_secs: u64,

    /// Sweep retries for a user whose lock is held
    pub busy_retry_attempts: u32,

    /// Linear backoff step between those retries
    pub busy_retry_backoff_ms: u64,
}

impl EngineConfig {
    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("tier_evaluation_interval_hours", self.tier_evaluation_interval_hours),
            ("expiry_sweep_interval_secs", self.expiry_sweep_interval_secs),
            ("lock_timeout_ms", self.lock_timeout_ms),
            ("evaluation_batch_size", self.evaluation_batch_size as u64),
            ("max_concurrent_tier_evaluations", self.max_concurrent_tier_evaluations as u64),
            ("max_activity_batch_size", self.max_activity_batch_size as u64),
            ("order_window_months", u64::from(self.order_window_months)),
            ("activity_retention_months", u64::from(self.activity_retention_months)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ValidationError::MustBePositive(name));
        }
        if self.max_activity_value <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive("max_activity_value"));
        }
        if self.order_window_months > self.activity_retention_months {
            return Err(ValidationError::OrderWindowExceedsRetention {
                window: self.order_window_months,
                retention: self.activity_retention_months,
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tier_evaluation_interval_hours: 6,
            evaluation_batch_size: 100,
            max_concurrent_tier_evaluations: 10,
            activity_retention_months: 24,
            order_window_months: 12,
            max_activity_batch_size: 100,
            lock_timeout_ms: 500,
            renewal_window_days: 7,
            cancellation_reason_max_length: 500,
            max_activity_value: dec!(999999.99),
            expiry_sweep_interval_secs: 300,
            busy_retry_attempts: 3,
            busy_retry_backoff_ms: 50,
        }
    }
}
