//! Shared fixture for handler tests: the standard catalog wired to the
//! in-memory adapters and a manual clock.

use chrono::{TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    InMemoryActivityStore, InMemoryCohortProvider, InMemoryEventBus,
    InMemorySubscriptionRepository, ManualClock, StaticCatalogSource,
};
use crate::application::{Catalog, HandlerContext, MembershipPolicy, UserLocks};
use crate::config::CatalogConfig;
use crate::domain::activity::{Activity, ActivityType};
use crate::domain::foundation::{PlanId, TierId, Timestamp, UserId};
use crate::domain::membership::Subscription;
use crate::ports::{ActivityStore, Clock, SubscriptionRepository};

pub(crate) struct Fixture {
    pub ctx: HandlerContext,
    pub repo: InMemorySubscriptionRepository,
    pub activity: InMemoryActivityStore,
    pub cohorts: InMemoryCohortProvider,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<InMemoryEventBus>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_policy(MembershipPolicy {
            lock_timeout: Duration::from_millis(50),
            ..Default::default()
        })
        .await
    }

    pub async fn with_policy(policy: MembershipPolicy) -> Self {
        let catalog_config = CatalogConfig::default();
        let source =
            StaticCatalogSource::from_definitions(catalog_config.plans, catalog_config.tiers)
                .unwrap();
        let catalog = Arc::new(Catalog::load(Arc::new(source)).await.unwrap());

        let repo = InMemorySubscriptionRepository::new();
        let activity = InMemoryActivityStore::new();
        let cohorts = InMemoryCohortProvider::new();
        let clock = Arc::new(ManualClock::new(start()));
        let bus = Arc::new(InMemoryEventBus::new());

        let ctx = HandlerContext {
            subscriptions: Arc::new(repo.clone()),
            activity: Arc::new(activity.clone()),
            cohorts: Arc::new(cohorts.clone()),
            catalog,
            locks: Arc::new(UserLocks::new(policy.lock_timeout)),
            clock: clock.clone(),
            events: bus.clone(),
            policy,
        };

        Self {
            ctx,
            repo,
            activity,
            cohorts,
            clock,
            bus,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Overwrites the stored subscription.
    pub async fn save(&self, subscription: &Subscription) {
        self.repo.update(subscription).await.unwrap();
    }

    /// Records `count` orders splitting `total` evenly, dated now.
    pub async fn record_orders(&self, user_id: &UserId, count: u32, total: Decimal) {
        let now = self.now();
        let each = (total / Decimal::from(count)).to_f64().unwrap();
        let orders: Vec<Activity> = (0..count)
            .map(|_| Activity::new(user_id.clone(), ActivityType::Order, each, now).unwrap())
            .collect();
        let retain_from = self.ctx.policy.activity_policy().retention_start(now);
        self.activity.record_all(&orders, retain_from, now).await.unwrap();
    }
}

/// 2024-03-10 09:00 UTC.
pub(crate) fn start() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap())
}

pub(crate) fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub(crate) fn plan(id: &str) -> PlanId {
    PlanId::new(id).unwrap()
}

pub(crate) fn tier(id: &str) -> TierId {
    TierId::new(id).unwrap()
}
