//! Catalog query filters.
//!
//! Every field is optional; an empty filter matches every active entry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Cohort, Plan, PlanType, Tier, TierBenefits, TierLevel};

/// Filter over plans. Price and duration bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanFilter {
    pub plan_type: Option<PlanType>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_duration_months: Option<u32>,
    pub max_duration_months: Option<u32>,
    pub include_inactive: bool,
}

impl PlanFilter {
    pub fn matches(&self, plan: &Plan) -> bool {
        if !self.include_inactive && !plan.is_active() {
            return false;
        }
        if self.plan_type.is_some_and(|t| t != plan.plan_type()) {
            return false;
        }
        if self.min_price.is_some_and(|min| plan.price() < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| plan.price() > max) {
            return false;
        }
        let months = plan.duration_months();
        if self.min_duration_months.is_some_and(|min| months < min) {
            return false;
        }
        if self.max_duration_months.is_some_and(|max| months > max) {
            return false;
        }
        true
    }
}

/// Filter over tiers.
///
/// `required_benefits` lists flags a tier must grant; `cohort` keeps tiers
/// open to that cohort (including tiers with no cohort restriction).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierFilter {
    pub level: Option<TierLevel>,
    pub min_discount: Option<Decimal>,
    pub required_benefits: TierBenefits,
    pub cohort: Option<Cohort>,
    pub include_inactive: bool,
}

impl TierFilter {
    pub fn matches(&self, tier: &Tier) -> bool {
        if !self.include_inactive && !tier.is_active() {
            return false;
        }
        if self.level.is_some_and(|level| level != tier.level()) {
            return false;
        }
        if self
            .min_discount
            .is_some_and(|min| tier.discount_percent() < min)
        {
            return false;
        }
        if !tier.benefits().includes(&self.required_benefits) {
            return false;
        }
        match &self.cohort {
            Some(cohort) => tier.admits_cohort(cohort),
            None => true,
        }
    }
}
