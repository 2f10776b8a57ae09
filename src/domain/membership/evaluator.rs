//! Tier evaluation.
//!
//! Pure decision logic: given a user's eligibility metrics and cohorts,
//! pick the best tier on the ladder the user qualifies for and classify the
//! move relative to the tier currently held.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::activity::EligibilityMetrics;
use crate::domain::catalog::{rank_tiers, Cohort, Tier, TierLadder, TierLevel};
use crate::domain::foundation::TierId;

/// The identifying facts of a tier, copied into subscriptions and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRef {
    pub id: TierId,
    pub level: TierLevel,
    pub discount_percent: Decimal,
}

impl TierRef {
    /// Same ordering as the catalog ranking: level, then discount, then
    /// lowest id.
    pub fn rank_cmp(&self, other: &TierRef) -> Ordering {
        self.level
            .cmp(&other.level)
            .then_with(|| self.discount_percent.cmp(&other.discount_percent))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl From<&Tier> for TierRef {
    fn from(tier: &Tier) -> Self {
        Self {
            id: tier.id().clone(),
            level: tier.level(),
            discount_percent: tier.discount_percent(),
        }
    }
}

/// Direction of a tier move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierDirection {
    Upgrade,
    Downgrade,
    Unchanged,
}

impl TierDirection {
    /// Classifies a move from `current` to `target`.
    pub fn between(current: &TierRef, target: &TierRef) -> Self {
        if current.id == target.id {
            return TierDirection::Unchanged;
        }
        match target.rank_cmp(current) {
            Ordering::Greater => TierDirection::Upgrade,
            Ordering::Less => TierDirection::Downgrade,
            Ordering::Equal => TierDirection::Unchanged,
        }
    }
}

impl fmt::Display for TierDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TierDirection::Upgrade => "UPGRADE",
            TierDirection::Downgrade => "DOWNGRADE",
            TierDirection::Unchanged => "UNCHANGED",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of evaluating a user against the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDecision {
    pub tier: TierRef,
    pub direction: TierDirection,
}

impl TierDecision {
    pub fn new_tier_id(&self) -> &TierId {
        &self.tier.id
    }
}

/// A threshold the user falls short of, reported for client display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "requirement", rename_all = "snake_case")]
pub enum UnmetRequirement {
    MinOrders { required: u32, actual: u32 },
    MinMonthlySpend { required: Decimal, actual: Decimal },
    Cohort { required: Vec<Cohort> },
    Inactive,
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetRequirement::MinOrders { required, actual } => {
                write!(f, "requires {} orders, has {}", required, actual)
            }
            UnmetRequirement::MinMonthlySpend { required, actual } => {
                write!(f, "requires {} monthly spend, has {}", required, actual)
            }
            UnmetRequirement::Cohort { required } => {
                let names: Vec<&str> = required.iter().map(Cohort::as_str).collect();
                write!(f, "requires membership in one of [{}]", names.join(", "))
            }
            UnmetRequirement::Inactive => write!(f, "tier is not currently offered"),
        }
    }
}

/// Decides which tier a user qualifies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEvaluator {
    cohort_rules: bool,
}

impl Default for TierEvaluator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TierEvaluator {
    /// With `cohort_rules` off, tier cohort restrictions are ignored.
    pub fn new(cohort_rules: bool) -> Self {
        Self { cohort_rules }
    }

    /// Lists every requirement of `tier` the user misses. Thresholds are
    /// inclusive.
    pub fn check_eligibility(
        &self,
        tier: &Tier,
        metrics: &EligibilityMetrics,
        cohorts: &BTreeSet<Cohort>,
    ) -> Result<(), Vec<UnmetRequirement>> {
        let mut unmet = Vec::new();

        if !tier.is_active() {
            unmet.push(UnmetRequirement::Inactive);
        }
        if metrics.orders_in_window < tier.min_orders() {
            unmet.push(UnmetRequirement::MinOrders {
                required: tier.min_orders(),
                actual: metrics.orders_in_window,
            });
        }
        if metrics.monthly_spend < tier.min_monthly_spend() {
            unmet.push(UnmetRequirement::MinMonthlySpend {
                required: tier.min_monthly_spend(),
                actual: metrics.monthly_spend,
            });
        }
        if self.cohort_rules && !tier.cohort_requirement_met(cohorts) {
            unmet.push(UnmetRequirement::Cohort {
                required: tier.eligible_cohorts().iter().cloned().collect(),
            });
        }

        if unmet.is_empty() {
            Ok(())
        } else {
            Err(unmet)
        }
    }

    pub fn is_eligible(
        &self,
        tier: &Tier,
        metrics: &EligibilityMetrics,
        cohorts: &BTreeSet<Cohort>,
    ) -> bool {
        self.check_eligibility(tier, metrics, cohorts).is_ok()
    }

    /// The highest-ranked eligible tier, or the ladder's baseline when none is.
    pub fn select<'a>(
        &self,
        metrics: &EligibilityMetrics,
        cohorts: &BTreeSet<Cohort>,
        ladder: &'a TierLadder,
    ) -> &'a Tier {
        ladder
            .tiers()
            .iter()
            .filter(|tier| self.is_eligible(tier, metrics, cohorts))
            .max_by(|a, b| rank_tiers(a, b))
            .unwrap_or_else(|| ladder.baseline())
    }

    /// Selects a tier and classifies it against `current`. Never fails.
    pub fn evaluate(
        &self,
        metrics: &EligibilityMetrics,
        cohorts: &BTreeSet<Cohort>,
        ladder: &TierLadder,
        current: &TierRef,
    ) -> TierDecision {
        let tier = TierRef::from(self.select(metrics, cohorts, ladder));
        let direction = TierDirection::between(current, &tier);
        TierDecision { tier, direction }
    }
}
