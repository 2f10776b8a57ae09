//! Catalog seed: the plans and tiers the static catalog source starts with

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::catalog::{
    CatalogSnapshot, Plan, PlanDefinition, PlanType, Tier, TierBenefits, TierDefinition,
    TierLevel,
};

use super::error::ValidationError;

/// Catalog configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub plans: Vec<PlanDefinition>,
    pub tiers: Vec<TierDefinition>,
}

impl CatalogConfig {
    /// Validate catalog configuration by building a throwaway snapshot.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.plans.is_empty() {
            return Err(ValidationError::EmptyCatalog("plans"));
        }
        if self.tiers.is_empty() {
            return Err(ValidationError::EmptyCatalog("tiers"));
        }

        let invalid = |e: crate::domain::foundation::ValidationError| {
            ValidationError::InvalidCatalog(e.to_string())
        };
        let plans = self
            .plans
            .iter()
            .cloned()
            .map(Plan::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        let tiers = self
            .tiers
            .iter()
            .cloned()
            .map(Tier::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        CatalogSnapshot::new(0, plans, tiers).map_err(invalid)?;
        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            plans: vec![
                plan("monthly", "Monthly", PlanType::Monthly, dec!(9.99)),
                plan("quarterly", "Quarterly", PlanType::Quarterly, dec!(27.99)),
                plan("yearly", "Yearly", PlanType::Yearly, dec!(99.99)),
            ],
            tiers: vec![
                tier(
                    "silver",
                    "Silver",
                    TierLevel::Silver,
                    (0, Decimal::ZERO),
                    dec!(5),
                    TierBenefits::default(),
                ),
                tier(
                    "gold",
                    "Gold",
                    TierLevel::Gold,
                    (5, dec!(100)),
                    dec!(10),
                    TierBenefits {
                        free_delivery: true,
                        ..Default::default()
                    },
                ),
                tier(
                    "platinum",
                    "Platinum",
                    TierLevel::Platinum,
                    (15, dec!(500)),
                    dec!(15),
                    TierBenefits::all(),
                ),
            ],
        }
    }
}

fn plan(id: &str, name: &str, plan_type: PlanType, price: Decimal) -> PlanDefinition {
    PlanDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        plan_type,
        price,
        active: true,
    }
}

fn tier(
    id: &str,
    name: &str,
    level: TierLevel,
    (min_orders, min_monthly_spend): (u32, Decimal),
    discount_percent: Decimal,
    benefits: TierBenefits,
) -> TierDefinition {
    TierDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        level,
        min_orders,
        min_monthly_spend,
        discount_percent,
        benefits,
        eligible_cohorts: Vec::new(),
        active: true,
    }
}
