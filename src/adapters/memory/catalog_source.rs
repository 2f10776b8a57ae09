//! Static catalog source seeded from configuration.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::catalog::{Plan, PlanDefinition, Tier, TierDefinition};
use crate::domain::foundation::{DomainError, ValidationError};
use crate::ports::CatalogSource;

#[derive(Debug, Default)]
struct Contents {
    plans: Vec<Plan>,
    tiers: Vec<Tier>,
}

/// Catalog source holding a fixed plan and tier list.
///
/// `replace` swaps the contents; the catalog service picks them up on its
/// next reload.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    contents: Arc<RwLock<Contents>>,
}

impl StaticCatalogSource {
    pub fn new(plans: Vec<Plan>, tiers: Vec<Tier>) -> Self {
        Self {
            contents: Arc::new(RwLock::new(Contents { plans, tiers })),
        }
    }

    /// Validates raw definitions into a source.
    pub fn from_definitions(
        plans: Vec<PlanDefinition>,
        tiers: Vec<TierDefinition>,
    ) -> Result<Self, ValidationError> {
        let plans = plans
            .into_iter()
            .map(Plan::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let tiers = tiers
            .into_iter()
            .map(Tier::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(plans, tiers))
    }

    pub async fn replace(&self, plans: Vec<Plan>, tiers: Vec<Tier>) {
        *self.contents.write().await = Contents { plans, tiers };
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load_plans(&self) -> Result<Vec<Plan>, DomainError> {
        Ok(self.contents.read().await.plans.clone())
    }

    async fn load_tiers(&self) -> Result<Vec<Tier>, DomainError> {
        Ok(self.contents.read().await.tiers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{PlanType, TierBenefits, TierLevel};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn plan_def(id: &str, price: Decimal) -> PlanDefinition {
        PlanDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            plan_type: PlanType::Monthly,
            price,
            active: true,
        }
    }

    fn tier_def(id: &str) -> TierDefinition {
        TierDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            level: TierLevel::Silver,
            min_orders: 0,
            min_monthly_spend: Decimal::ZERO,
            discount_percent: dec!(5),
            benefits: TierBenefits::default(),
            eligible_cohorts: vec![],
            active: true,
        }
    }

    #[tokio::test]
    async fn loads_validated_definitions() {
        let source =
            StaticCatalogSource::from_definitions(vec![plan_def("monthly", dec!(9.99))], vec![tier_def("silver")])
                .unwrap();
        assert_eq!(source.load_plans().await.unwrap().len(), 1);
        assert_eq!(source.load_tiers().await.unwrap().len(), 1);
    }

    #[test]
    fn invalid_definition_is_rejected() {
        let result =
            StaticCatalogSource::from_definitions(vec![plan_def("free", Decimal::ZERO)], vec![]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn replace_swaps_contents() {
        let source = StaticCatalogSource::default();
        let plan = Plan::try_from(plan_def("yearly", dec!(99.99))).unwrap();
        source.replace(vec![plan], vec![]).await;
        assert_eq!(source.load_plans().await.unwrap()[0].id().as_str(), "yearly");
    }
}
