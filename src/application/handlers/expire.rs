//! System-triggered lifecycle transitions driven by time.
//!
//! `ExpireSubscriptionHandler` ends subscriptions whose expiry has passed and
//! `MarkRenewalDueHandler` flags ACTIVE subscriptions entering their renewal
//! window. Both re-read the subscription under the user's lock, so a
//! concurrent renewal or a second sweep sees the settled state and the call
//! becomes a no-op.

use crate::domain::foundation::SubscriptionId;
use crate::domain::membership::{
    MembershipError, Subscription, SubscriptionEvent, SubscriptionStatus,
};

use crate::application::HandlerContext;

/// Command to expire one subscription.
#[derive(Debug, Clone)]
pub struct ExpireSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

/// What an expiry attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpireOutcome {
    Expired(Subscription),
    /// Already CANCELLED or EXPIRED.
    AlreadyFinal(SubscriptionStatus),
    /// Still inside its period, for instance after a concurrent renewal.
    NotDue,
}

pub struct ExpireSubscriptionHandler {
    ctx: HandlerContext,
}

impl ExpireSubscriptionHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: ExpireSubscriptionCommand,
    ) -> Result<ExpireOutcome, MembershipError> {
        let owner = self.load(&cmd.subscription_id).await?.user_id;
        let lock = self.ctx.locks.acquire(&owner).await?;
        let now = self.ctx.clock.now();

        let mut subscription = self.load(&cmd.subscription_id).await?;
        if !subscription.is_live() {
            return Ok(ExpireOutcome::AlreadyFinal(subscription.status));
        }
        if !subscription.is_past_expiry(now) {
            return Ok(ExpireOutcome::NotDue);
        }

        let previous = subscription.status;
        subscription.expire(now)?;
        self.ctx.subscriptions.update(&subscription).await?;
        drop(lock);

        tracing::info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            previous_status = %previous,
            "Subscription expired"
        );
        self.ctx
            .publish(vec![SubscriptionEvent::expired(&subscription, previous, now)])
            .await;

        Ok(ExpireOutcome::Expired(subscription))
    }

    async fn load(&self, id: &SubscriptionId) -> Result<Subscription, MembershipError> {
        self.ctx
            .subscriptions
            .find_by_id(id)
            .await?
            .ok_or(MembershipError::SubscriptionNotFound(*id))
    }
}

/// Command to flag a subscription whose renewal window has opened.
#[derive(Debug, Clone)]
pub struct MarkRenewalDueCommand {
    pub subscription_id: SubscriptionId,
}

pub struct MarkRenewalDueHandler {
    ctx: HandlerContext,
}

impl MarkRenewalDueHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    /// Returns true if the subscription moved to PENDING_RENEWAL.
    pub async fn handle(&self, cmd: MarkRenewalDueCommand) -> Result<bool, MembershipError> {
        let Some(window_days) = self.ctx.policy.renewal_window() else {
            return Ok(false);
        };

        let Some(owner) = self.ctx.subscriptions.find_by_id(&cmd.subscription_id).await? else {
            return Err(MembershipError::SubscriptionNotFound(cmd.subscription_id));
        };
        let lock = self.ctx.locks.acquire(&owner.user_id).await?;
        let now = self.ctx.clock.now();

        let mut subscription = self
            .ctx
            .subscriptions
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or(MembershipError::SubscriptionNotFound(cmd.subscription_id))?;
        if !subscription.is_renewal_due(now, window_days) {
            return Ok(false);
        }

        subscription.mark_renewal_due(now)?;
        self.ctx.subscriptions.update(&subscription).await?;
        drop(lock);

        tracing::info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            days_remaining = subscription.days_remaining(now),
            "Subscription renewal due"
        );
        self.ctx
            .publish(vec![SubscriptionEvent::renewal_due(&subscription, now)])
            .await;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{plan, user, Fixture};
    use crate::application::handlers::{SubscribeCommand, SubscribeHandler};
    use crate::domain::foundation::ErrorCode;

    async fn subscribe(fx: &Fixture) -> Subscription {
        SubscribeHandler::new(fx.ctx.clone())
            .handle(SubscribeCommand {
                user_id: user("alice"),
                plan_id: plan("monthly"),
                tier_id: None,
            })
            .await
            .unwrap()
            .subscription
    }

    #[tokio::test]
    async fn expires_once_past_expiry() {
        let fx = Fixture::new().await;
        let sub = subscribe(&fx).await;
        let handler = ExpireSubscriptionHandler::new(fx.ctx.clone());
        let cmd = ExpireSubscriptionCommand {
            subscription_id: sub.id,
        };

        assert_eq!(handler.handle(cmd.clone()).await.unwrap(), ExpireOutcome::NotDue);

        fx.clock.set(sub.expires_at.plus_secs(1));
        match handler.handle(cmd.clone()).await.unwrap() {
            ExpireOutcome::Expired(expired) => {
                assert_eq!(expired.status, SubscriptionStatus::Expired);
                assert_eq!(expired.expired_at, Some(fx.now()));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(
            handler.handle(cmd).await.unwrap(),
            ExpireOutcome::AlreadyFinal(SubscriptionStatus::Expired)
        );
        assert_eq!(fx.bus.events_of_type("subscription.expired").len(), 1);
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let fx = Fixture::new().await;
        let err = ExpireSubscriptionHandler::new(fx.ctx.clone())
            .handle(ExpireSubscriptionCommand {
                subscription_id: SubscriptionId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn renewal_due_is_flagged_inside_window_only() {
        let fx = Fixture::new().await;
        let sub = subscribe(&fx).await;
        let handler = MarkRenewalDueHandler::new(fx.ctx.clone());
        let cmd = MarkRenewalDueCommand {
            subscription_id: sub.id,
        };

        assert!(!handler.handle(cmd.clone()).await.unwrap());

        fx.clock.set(sub.expires_at.minus_days(2));
        assert!(handler.handle(cmd.clone()).await.unwrap());
        assert!(!handler.handle(cmd).await.unwrap());

        let stored = fx.ctx.live_subscription(&user("alice")).await.unwrap();
        assert_eq!(stored.status, SubscriptionStatus::PendingRenewal);
        assert_eq!(fx.bus.events_of_type("subscription.renewal_due").len(), 1);
    }
}
