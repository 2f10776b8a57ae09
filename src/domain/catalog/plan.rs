//! Billing plans.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PlanId, ValidationError};

/// Billing period of a plan, each with a fixed month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Monthly,
    Quarterly,
    Yearly,
}

impl PlanType {
    /// Number of calendar months one billing period covers.
    pub fn duration_months(&self) -> u32 {
        match self {
            PlanType::Monthly => 1,
            PlanType::Quarterly => 3,
            PlanType::Yearly => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "MONTHLY",
            PlanType::Quarterly => "QUARTERLY",
            PlanType::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MONTHLY" => Ok(PlanType::Monthly),
            "QUARTERLY" => Ok(PlanType::Quarterly),
            "YEARLY" => Ok(PlanType::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unknown plan type '{}'", other),
            )),
        }
    }
}

/// Raw plan fields, as read from configuration or a catalog store.
///
/// Converted into a [`Plan`] through `TryFrom`, which validates every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub plan_type: PlanType,
    pub price: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A billing plan a user can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    id: PlanId,
    name: String,
    description: Option<String>,
    plan_type: PlanType,
    price: Decimal,
    active: bool,
}

impl Plan {
    pub fn id(&self) -> &PlanId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn plan_type(&self) -> PlanType {
        self.plan_type
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn duration_months(&self) -> u32 {
        self.plan_type.duration_months()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl TryFrom<PlanDefinition> for Plan {
    type Error = ValidationError;

    fn try_from(def: PlanDefinition) -> Result<Self, Self::Error> {
        let id = PlanId::new(def.id)?;
        let name = def.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if def.price <= Decimal::ZERO {
            return Err(ValidationError::invalid_format(
                "price",
                format!("must be greater than zero, got {}", def.price),
            ));
        }

        Ok(Self {
            id,
            name,
            description: def.description.filter(|d| !d.trim().is_empty()),
            plan_type: def.plan_type,
            price: def.price,
            active: def.active,
        })
    }
}
