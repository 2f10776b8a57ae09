//! In-memory subscription repository.
//!
//! Reference implementation of the persistence contract, used by the worker
//! binary and tests. A live-subscription index keyed by user enforces the
//! one-live-subscription rule on every write.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::membership::{Subscription, SubscriptionStatus};
use crate::ports::{ExpiryCursor, SubscriptionRepository};

#[derive(Debug, Default)]
struct State {
    by_id: HashMap<SubscriptionId, Subscription>,
    /// Subscription ids per user, in creation order.
    by_user: HashMap<UserId, Vec<SubscriptionId>>,
    /// The live subscription of each user, ordered for keyset scans.
    live: BTreeMap<UserId, SubscriptionId>,
}

impl State {
    fn live_conflict(&self, subscription: &Subscription) -> Option<DomainError> {
        if !subscription.is_live() {
            return None;
        }
        match self.live.get(&subscription.user_id) {
            Some(existing) if *existing != subscription.id => Some(
                DomainError::new(
                    ErrorCode::ActiveSubscriptionExists,
                    format!("user {} already has a live subscription", subscription.user_id),
                )
                .with_detail("user_id", subscription.user_id.as_str()),
            ),
            _ => None,
        }
    }

    fn index_live(&mut self, subscription: &Subscription) {
        if subscription.is_live() {
            self.live
                .insert(subscription.user_id.clone(), subscription.id);
        } else if self.live.get(&subscription.user_id) == Some(&subscription.id) {
            self.live.remove(&subscription.user_id);
        }
    }
}

/// Subscription repository held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    state: Arc<RwLock<State>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored subscriptions in any status.
    pub async fn len(&self) -> usize {
        self.state.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every subscription the user has held, oldest first.
    pub async fn history_for(&self, user_id: &UserId) -> Vec<Subscription> {
        let state = self.state.read().await;
        state
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().filter_map(|id| state.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.by_id.contains_key(&subscription.id) {
            return Err(DomainError::database(format!(
                "subscription {} already stored",
                subscription.id
            )));
        }
        if let Some(conflict) = state.live_conflict(subscription) {
            return Err(conflict);
        }

        state.index_live(subscription);
        state
            .by_user
            .entry(subscription.user_id.clone())
            .or_default()
            .push(subscription.id);
        state.by_id.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.by_id.contains_key(&subscription.id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} not found", subscription.id),
            ));
        }
        if let Some(conflict) = state.live_conflict(subscription) {
            return Err(conflict);
        }

        state.index_live(subscription);
        state.by_id.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.state.read().await.by_id.get(id).cloned())
    }

    async fn find_live_by_user(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .live
            .get(user_id)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn find_latest_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .by_user
            .get(user_id)
            .and_then(|ids| ids.last())
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn find_live_after(
        &self,
        after: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        let lower = match after {
            Some(user_id) => Bound::Excluded(user_id.clone()),
            None => Bound::Unbounded,
        };
        Ok(state
            .live
            .range((lower, Bound::Unbounded))
            .take(limit)
            .filter_map(|(_, id)| state.by_id.get(id).cloned())
            .collect())
    }

    async fn find_expiring_before(
        &self,
        status: SubscriptionStatus,
        before: Timestamp,
        after: Option<ExpiryCursor>,
        limit: usize,
    ) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        let mut expiring: Vec<Subscription> = state
            .live
            .values()
            .filter_map(|id| state.by_id.get(id))
            .filter(|sub| sub.status == status && sub.expires_at.is_before(&before))
            .filter(|sub| match after {
                Some(cursor) => ExpiryCursor::from(*sub) > cursor,
                None => true,
            })
            .cloned()
            .collect();
        expiring.sort_by_key(|sub| (sub.expires_at, sub.id));
        expiring.truncate(limit);
        Ok(expiring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{
        Plan, PlanDefinition, PlanType, Tier, TierBenefits, TierDefinition, TierLevel,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn plan() -> Plan {
        Plan::try_from(PlanDefinition {
            id: "monthly".to_string(),
            name: "Monthly".to_string(),
            description: None,
            plan_type: PlanType::Monthly,
            price: dec!(9.99),
            active: true,
        })
        .unwrap()
    }

    fn silver() -> Tier {
        Tier::try_from(TierDefinition {
            id: "silver".to_string(),
            name: "Silver".to_string(),
            description: None,
            level: TierLevel::Silver,
            min_orders: 0,
            min_monthly_spend: Decimal::ZERO,
            discount_percent: dec!(5),
            benefits: TierBenefits::default(),
            eligible_cohorts: vec![],
            active: true,
        })
        .unwrap()
    }

    fn subscription(user: &str, now: Timestamp) -> Subscription {
        Subscription::create(UserId::new(user).unwrap(), &plan(), &silver(), now)
    }

    #[tokio::test]
    async fn insert_then_find_live_by_user() {
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription("alice", Timestamp::from_unix_secs(1_700_000_000));
        repo.insert(&sub).await.unwrap();

        let found = repo.find_live_by_user(&sub.user_id).await.unwrap();
        assert_eq!(found, Some(sub));
    }

    #[tokio::test]
    async fn second_live_subscription_is_rejected() {
        let repo = InMemorySubscriptionRepository::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);
        repo.insert(&subscription("alice", now)).await.unwrap();

        let err = repo.insert(&subscription("alice", now)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ActiveSubscriptionExists);
        assert_eq!(err.details.get("user_id").map(String::as_str), Some("alice"));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn cancelled_subscription_leaves_live_index() {
        let repo = InMemorySubscriptionRepository::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let mut sub = subscription("alice", now);
        repo.insert(&sub).await.unwrap();

        sub.cancel(None, now).unwrap();
        repo.update(&sub).await.unwrap();

        assert!(repo.find_live_by_user(&sub.user_id).await.unwrap().is_none());
        let latest = repo.find_latest_by_user(&sub.user_id).await.unwrap().unwrap();
        assert_eq!(latest.id, sub.id);

        repo.insert(&subscription("alice", now)).await.unwrap();
        assert_eq!(repo.history_for(&sub.user_id).await.len(), 2);
    }

    #[tokio::test]
    async fn update_of_unknown_subscription_fails() {
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription("alice", Timestamp::from_unix_secs(1_700_000_000));
        let err = repo.update(&sub).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn find_live_after_pages_by_user_id() {
        let repo = InMemorySubscriptionRepository::new();
        let now = Timestamp::from_unix_secs(1_700_000_000);
        for user in ["carol", "alice", "dave", "bob"] {
            repo.insert(&subscription(user, now)).await.unwrap();
        }

        let first = repo.find_live_after(None, 2).await.unwrap();
        let users: Vec<&str> = first.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);

        let second = repo
            .find_live_after(Some(&first[1].user_id), 2)
            .await
            .unwrap();
        let users: Vec<&str> = second.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(users, vec!["carol", "dave"]);

        let third = repo
            .find_live_after(Some(&second[1].user_id), 2)
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn find_expiring_before_orders_soonest_first() {
        let repo = InMemorySubscriptionRepository::new();
        let early = subscription("early", Timestamp::from_unix_secs(1_700_000_000));
        let late = subscription("late", Timestamp::from_unix_secs(1_700_500_000));
        repo.insert(&late).await.unwrap();
        repo.insert(&early).await.unwrap();

        let cutoff = late.expires_at.plus_secs(1);
        let expiring = repo
            .find_expiring_before(SubscriptionStatus::Active, cutoff, None, 10)
            .await
            .unwrap();
        assert_eq!(expiring.len(), 2);
        assert_eq!(expiring[0].id, early.id);

        let only_early = repo
            .find_expiring_before(
                SubscriptionStatus::Active,
                early.expires_at.plus_secs(1),
                None,
                10,
            )
            .await
            .unwrap();
        assert_eq!(only_early.len(), 1);
    }

    #[tokio::test]
    async fn find_expiring_before_filters_by_status() {
        let repo = InMemorySubscriptionRepository::new();
        let mut pending = subscription("pending", Timestamp::from_unix_secs(1_700_000_000));
        pending.status = SubscriptionStatus::PendingRenewal;
        let active = subscription("active", Timestamp::from_unix_secs(1_700_000_000));
        repo.insert(&pending).await.unwrap();
        repo.insert(&active).await.unwrap();

        let cutoff = Timestamp::from_unix_secs(1_900_000_000);
        let found = repo
            .find_expiring_before(SubscriptionStatus::PendingRenewal, cutoff, None, 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, pending.id);
    }

    #[tokio::test]
    async fn find_expiring_before_resumes_after_cursor() {
        let repo = InMemorySubscriptionRepository::new();
        let expires = Timestamp::from_unix_secs(1_700_000_000);
        for user in ["alice", "bob", "carol"] {
            repo.insert(&subscription(user, expires)).await.unwrap();
        }
        let cutoff = Timestamp::from_unix_secs(1_900_000_000);

        let first = repo
            .find_expiring_before(SubscriptionStatus::Active, cutoff, None, 2)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        let cursor = ExpiryCursor::from(&first[1]);
        let rest = repo
            .find_expiring_before(SubscriptionStatus::Active, cutoff, Some(cursor), 2)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert!(first.iter().all(|sub| sub.id != rest[0].id));
    }
}
