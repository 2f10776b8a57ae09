//! Feature flags configuration

use serde::Deserialize;

/// Switches for optional engine behaviour. Everything is on by default.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeatureFlags {
    /// Evaluate upgrades as soon as an order is recorded
    pub enable_eager_upgrades: bool,

    /// Honour tier cohort restrictions; when off every tier is open
    pub enable_cohort_based_tiers: bool,

    /// Restrict renewal to the window before expiry and flag subscriptions
    /// entering it
    pub enable_renewal_window: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_eager_upgrades: true,
            enable_cohort_based_tiers: true,
            enable_renewal_window: true,
        }
    }
}
