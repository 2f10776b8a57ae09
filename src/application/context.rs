//! Dependencies shared by the lifecycle handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::activity::EligibilityMetrics;
use crate::domain::catalog::Cohort;
use crate::domain::foundation::{SerializableDomainEvent, Timestamp, UserId};
use crate::domain::membership::{MembershipError, Subscription, SubscriptionEvent};
use crate::ports::{
    ActivityStore, Clock, CohortProvider, EventPublisher, SubscriptionRepository,
};

use super::{Catalog, MembershipPolicy, UserLocks};

/// Ports, catalog, lock registry and policy, cloned into every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub activity: Arc<dyn ActivityStore>,
    pub cohorts: Arc<dyn CohortProvider>,
    pub catalog: Arc<Catalog>,
    pub locks: Arc<UserLocks>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventPublisher>,
    pub policy: MembershipPolicy,
}

/// What the evaluator needs to know about a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityInputs {
    pub metrics: EligibilityMetrics,
    pub cohorts: BTreeSet<Cohort>,
}

impl HandlerContext {
    /// The user's ACTIVE or PENDING_RENEWAL subscription.
    pub(crate) async fn live_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Subscription, MembershipError> {
        self.subscriptions
            .find_live_by_user(user_id)
            .await?
            .ok_or_else(|| MembershipError::NoActiveSubscription(user_id.clone()))
    }

    /// Reads metrics for the calendar month of `now` plus cohort labels.
    pub(crate) async fn eligibility_inputs(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<EligibilityInputs, MembershipError> {
        let metrics = self
            .activity
            .get(user_id)
            .await?
            .map(|aggregate| {
                aggregate.metrics(now.year_month(), self.policy.order_window_months)
            })
            .unwrap_or_default();
        let cohorts = self.cohorts.cohorts_for(user_id).await?;
        Ok(EligibilityInputs { metrics, cohorts })
    }

    /// Publishes events for a change that is already persisted.
    ///
    /// Failures are logged and swallowed; the committed change stands.
    /// Call only after the user lock has been released.
    pub(crate) async fn publish(&self, events: Vec<SubscriptionEvent>) {
        for event in events {
            let envelope = match event.to_envelope() {
                Ok(envelope) => envelope.with_user_id(event.user_id.as_str()),
                Err(e) => {
                    tracing::warn!(event_type = event.kind.event_type(), error = %e, "Failed to serialize subscription event");
                    continue;
                }
            };
            if let Err(e) = self.events.publish(envelope).await {
                tracing::warn!(
                    event_type = event.kind.event_type(),
                    subscription_id = %event.subscription_id,
                    error = %e,
                    "Failed to publish subscription event"
                );
            }
        }
    }
}
