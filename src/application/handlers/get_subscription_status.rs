//! GetSubscriptionStatusHandler - Query handler for a user's subscription.

use serde::Serialize;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::membership::{
    MembershipError, PlanSnapshot, SubscriptionStatus, TierRef, TierTransition,
};

use crate::application::HandlerContext;

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub user_id: UserId,
}

/// Read model of the user's current (or most recent) subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatusView {
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub plan: PlanSnapshot,
    pub tier: TierRef,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub days_remaining: u32,
    pub renewed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub expired_at: Option<Timestamp>,
    pub tier_history: Vec<TierTransition>,
}

/// Returns the live subscription if there is one, otherwise the latest.
/// Read-only; takes no lock.
pub struct GetSubscriptionStatusHandler {
    ctx: HandlerContext,
}

impl GetSubscriptionStatusHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<SubscriptionStatusView, MembershipError> {
        let subscription = match self.ctx.subscriptions.find_live_by_user(&query.user_id).await? {
            Some(live) => live,
            None => self
                .ctx
                .subscriptions
                .find_latest_by_user(&query.user_id)
                .await?
                .ok_or(MembershipError::NoSubscriptionForUser(query.user_id))?,
        };

        let now = self.ctx.clock.now();
        let days_remaining = if subscription.is_live() {
            subscription.days_remaining(now)
        } else {
            0
        };

        Ok(SubscriptionStatusView {
            subscription_id: subscription.id,
            days_remaining,
            cancellation_reason: subscription
                .cancellation_reason
                .as_ref()
                .map(|reason| reason.as_str().to_string()),
            user_id: subscription.user_id,
            status: subscription.status,
            plan: subscription.plan,
            tier: subscription.tier,
            started_at: subscription.started_at,
            expires_at: subscription.expires_at,
            renewed_at: subscription.renewed_at,
            cancelled_at: subscription.cancelled_at,
            expired_at: subscription.expired_at,
            tier_history: subscription.tier_history,
        })
    }
}
