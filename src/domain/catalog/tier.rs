//! Benefit tiers and their eligibility thresholds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{TierId, ValidationError};

use super::Cohort;

/// Ordinal benefit level of a tier.
///
/// Levels are strictly ordered: `Silver < Gold < Platinum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierLevel {
    Silver,
    Gold,
    Platinum,
}

impl TierLevel {
    /// Numeric ordinal used for upgrade/downgrade comparisons.
    pub fn ordinal(&self) -> u8 {
        match self {
            TierLevel::Silver => 1,
            TierLevel::Gold => 2,
            TierLevel::Platinum => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TierLevel::Silver => "SILVER",
            TierLevel::Gold => "GOLD",
            TierLevel::Platinum => "PLATINUM",
        }
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TierLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SILVER" => Ok(TierLevel::Silver),
            "GOLD" => Ok(TierLevel::Gold),
            "PLATINUM" => Ok(TierLevel::Platinum),
            other => Err(ValidationError::invalid_format(
                "level",
                format!("unknown tier level '{}'", other),
            )),
        }
    }
}

/// Benefit flags granted by a tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBenefits {
    pub free_delivery: bool,
    pub priority_support: bool,
    pub exclusive_deals: bool,
    pub early_access: bool,
}

impl TierBenefits {
    /// Every benefit enabled.
    pub fn all() -> Self {
        Self {
            free_delivery: true,
            priority_support: true,
            exclusive_deals: true,
            early_access: true,
        }
    }

    /// True if every flag set in `required` is also set here.
    pub fn includes(&self, required: &TierBenefits) -> bool {
        (!required.free_delivery || self.free_delivery)
            && (!required.priority_support || self.priority_support)
            && (!required.exclusive_deals || self.exclusive_deals)
            && (!required.early_access || self.early_access)
    }
}

/// Raw tier fields, as read from configuration or a catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub level: TierLevel,
    #[serde(default)]
    pub min_orders: u32,
    #[serde(default)]
    pub min_monthly_spend: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub benefits: TierBenefits,
    #[serde(default)]
    pub eligible_cohorts: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A benefit tier.
///
/// A user is eligible when both thresholds are met (inclusive) and, if
/// `eligible_cohorts` is non-empty, the user belongs to one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    id: TierId,
    name: String,
    description: Option<String>,
    level: TierLevel,
    min_orders: u32,
    min_monthly_spend: Decimal,
    discount_percent: Decimal,
    benefits: TierBenefits,
    eligible_cohorts: BTreeSet<Cohort>,
    active: bool,
}

impl Tier {
    pub fn id(&self) -> &TierId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn level(&self) -> TierLevel {
        self.level
    }

    pub fn min_orders(&self) -> u32 {
        self.min_orders
    }

    pub fn min_monthly_spend(&self) -> Decimal {
        self.min_monthly_spend
    }

    pub fn discount_percent(&self) -> Decimal {
        self.discount_percent
    }

    pub fn benefits(&self) -> &TierBenefits {
        &self.benefits
    }

    pub fn eligible_cohorts(&self) -> &BTreeSet<Cohort> {
        &self.eligible_cohorts
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when the tier carries a cohort requirement.
    pub fn is_cohort_restricted(&self) -> bool {
        !self.eligible_cohorts.is_empty()
    }

    /// True if a member of `cohort` may hold this tier (open tiers admit everyone).
    pub fn admits_cohort(&self, cohort: &Cohort) -> bool {
        self.eligible_cohorts.is_empty() || self.eligible_cohorts.contains(cohort)
    }

    /// True if any of `cohorts` satisfies the cohort requirement.
    pub fn cohort_requirement_met(&self, cohorts: &BTreeSet<Cohort>) -> bool {
        self.eligible_cohorts.is_empty() || !self.eligible_cohorts.is_disjoint(cohorts)
    }
}

impl TryFrom<TierDefinition> for Tier {
    type Error = ValidationError;

    fn try_from(def: TierDefinition) -> Result<Self, Self::Error> {
        let id = TierId::new(def.id)?;
        let name = def.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if def.min_monthly_spend < Decimal::ZERO {
            return Err(ValidationError::invalid_format(
                "min_monthly_spend",
                "must not be negative",
            ));
        }
        if def.discount_percent < Decimal::ZERO || def.discount_percent > Decimal::ONE_HUNDRED {
            return Err(ValidationError::invalid_format(
                "discount_percent",
                format!("must be between 0 and 100, got {}", def.discount_percent),
            ));
        }
        let eligible_cohorts = def
            .eligible_cohorts
            .into_iter()
            .map(Cohort::new)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            id,
            name,
            description: def.description.filter(|d| !d.trim().is_empty()),
            level: def.level,
            min_orders: def.min_orders,
            min_monthly_spend: def.min_monthly_spend,
            discount_percent: def.discount_percent,
            benefits: def.benefits,
            eligible_cohorts,
            active: def.active,
        })
    }
}
