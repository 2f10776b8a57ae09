//! Wires the engine to the in-memory adapters.
//!
//! Persistence is an external collaborator; the in-memory adapters are the
//! reference implementation used by the worker binary and the integration
//! tests.

use std::sync::Arc;
use thiserror::Error;

use crate::adapters::{
    InMemoryActivityStore, InMemoryCohortProvider, InMemoryEventBus,
    InMemorySubscriptionRepository, StaticCatalogSource,
};
use crate::application::{
    Catalog, HandlerContext, MembershipPolicy, MembershipService, SchedulerSettings, UserLocks,
};
use crate::config::AppConfig;
use crate::domain::foundation::ValidationError;
use crate::domain::membership::MembershipError;
use crate::ports::Clock;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Invalid catalog definition: {0}")]
    Catalog(#[from] ValidationError),

    #[error("Catalog could not be loaded: {0}")]
    CatalogLoad(#[from] MembershipError),
}

/// A fully wired engine plus handles on its adapters.
pub struct InMemoryEngine {
    pub service: MembershipService,
    pub scheduler_settings: SchedulerSettings,
    pub subscriptions: InMemorySubscriptionRepository,
    pub activity: InMemoryActivityStore,
    pub cohorts: InMemoryCohortProvider,
    pub catalog_source: StaticCatalogSource,
    pub events: Arc<InMemoryEventBus>,
}

impl InMemoryEngine {
    pub async fn build(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, BootstrapError> {
        let catalog_source = StaticCatalogSource::from_definitions(
            config.catalog.plans.clone(),
            config.catalog.tiers.clone(),
        )?;
        let catalog = Arc::new(Catalog::load(Arc::new(catalog_source.clone())).await?);

        let policy = MembershipPolicy::from_config(&config.engine, &config.features);
        let subscriptions = InMemorySubscriptionRepository::new();
        let activity = InMemoryActivityStore::new();
        let cohorts = InMemoryCohortProvider::new();
        let events = Arc::new(InMemoryEventBus::new());

        let ctx = HandlerContext {
            subscriptions: Arc::new(subscriptions.clone()),
            activity: Arc::new(activity.clone()),
            cohorts: Arc::new(cohorts.clone()),
            catalog,
            locks: Arc::new(UserLocks::new(policy.lock_timeout)),
            clock,
            events: events.clone(),
            policy,
        };

        tracing::info!(
            lock_timeout_ms = config.engine.lock_timeout_ms,
            plans = config.catalog.plans.len(),
            tiers = config.catalog.tiers.len(),
            "Membership engine wired to in-memory adapters"
        );

        Ok(Self {
            service: MembershipService::new(ctx),
            scheduler_settings: SchedulerSettings::from_config(&config.engine),
            subscriptions,
            activity,
            cohorts,
            catalog_source,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SystemClock;
    use crate::domain::catalog::PlanFilter;

    #[tokio::test]
    async fn builds_from_default_config() {
        let engine = InMemoryEngine::build(&AppConfig::default(), Arc::new(SystemClock))
            .await
            .unwrap();

        let plans = engine.service.list_plans(&PlanFilter::default()).await;
        assert_eq!(plans.len(), 3);
        assert_eq!(engine.scheduler_settings, SchedulerSettings::default());
    }

    #[tokio::test]
    async fn invalid_catalog_fails_to_build() {
        let mut config = AppConfig::default();
        config.catalog.plans[0].price = rust_decimal::Decimal::ZERO;

        let result = InMemoryEngine::build(&config, Arc::new(SystemClock)).await;
        assert!(matches!(result, Err(BootstrapError::Catalog(_))));
    }
}
