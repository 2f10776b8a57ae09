//! Runtime policy shared by the lifecycle handlers.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use crate::config::{EngineConfig, FeatureFlags};
use crate::domain::activity::ActivityPolicy;
use crate::domain::membership::TierEvaluator;

/// Thresholds and switches the handlers consult on every call.
///
/// Built once from configuration; tests construct it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipPolicy {
    pub lock_timeout: Duration,
    pub renewal_window_days: u32,
    pub renewal_window_enabled: bool,
    pub cancellation_reason_max_length: usize,
    pub order_window_months: u32,
    pub activity_retention_months: u32,
    pub max_activity_value: Decimal,
    pub max_activity_batch_size: usize,
    pub eager_upgrades: bool,
    pub cohort_rules: bool,
}

impl MembershipPolicy {
    pub fn from_config(engine: &EngineConfig, features: &FeatureFlags) -> Self {
        Self {
            lock_timeout: Duration::from_millis(engine.lock_timeout_ms),
            renewal_window_days: engine.renewal_window_days,
            renewal_window_enabled: features.enable_renewal_window,
            cancellation_reason_max_length: engine.cancellation_reason_max_length,
            order_window_months: engine.order_window_months,
            activity_retention_months: engine.activity_retention_months,
            max_activity_value: engine.max_activity_value,
            max_activity_batch_size: engine.max_activity_batch_size,
            eager_upgrades: features.enable_eager_upgrades,
            cohort_rules: features.enable_cohort_based_tiers,
        }
    }

    /// Renewal window length, or `None` when renewals are unrestricted.
    pub fn renewal_window(&self) -> Option<u32> {
        self.renewal_window_enabled.then_some(self.renewal_window_days)
    }

    pub fn activity_policy(&self) -> ActivityPolicy {
        ActivityPolicy::new(self.max_activity_value, self.activity_retention_months)
    }

    pub fn evaluator(&self) -> TierEvaluator {
        TierEvaluator::new(self.cohort_rules)
    }
}

impl Default for MembershipPolicy {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(500),
            renewal_window_days: 7,
            renewal_window_enabled: true,
            cancellation_reason_max_length: 500,
            order_window_months: 12,
            activity_retention_months: 24,
            max_activity_value: dec!(999999.99),
            max_activity_batch_size: 100,
            eager_upgrades: true,
            cohort_rules: true,
        }
    }
}
