//! RenewHandler - Command handler for renewing a live subscription.

use crate::domain::foundation::UserId;
use crate::domain::membership::{MembershipError, Subscription, SubscriptionEvent};

use crate::application::HandlerContext;

/// Command to renew the user's live subscription for another plan period.
#[derive(Debug, Clone)]
pub struct RenewCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct RenewResult {
    pub subscription: Subscription,
    pub event: SubscriptionEvent,
}

/// Handler for renewals.
///
/// The tier is carried over unchanged; only a scheduled evaluation can
/// demote it.
pub struct RenewHandler {
    ctx: HandlerContext,
}

impl RenewHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: RenewCommand) -> Result<RenewResult, MembershipError> {
        let lock = self.ctx.locks.acquire(&cmd.user_id).await?;
        let now = self.ctx.clock.now();

        let mut subscription = self.ctx.live_subscription(&cmd.user_id).await?;
        let previous = subscription.status;
        subscription.renew(now, self.ctx.policy.renewal_window())?;
        self.ctx.subscriptions.update(&subscription).await?;
        drop(lock);

        tracing::info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            previous_status = %previous,
            expires_at = %subscription.expires_at.as_datetime().to_rfc3339(),
            "Subscription renewed"
        );

        let event = SubscriptionEvent::renewed(&subscription, previous, now);
        self.ctx.publish(vec![event.clone()]).await;

        Ok(RenewResult {
            subscription,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{plan, user, Fixture};
    use crate::application::handlers::{SubscribeCommand, SubscribeHandler};
    use crate::application::MembershipPolicy;
    use crate::domain::foundation::ErrorCode;
    use crate::domain::membership::SubscriptionStatus;

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

    fn renew() -> RenewCommand {
        RenewCommand {
            user_id: user("alice"),
        }
    }

    #[tokio::test]
    async fn renewal_before_window_is_not_due() {
        let fx = Fixture::new().await;
        subscribe(&fx).await;

        let err = RenewHandler::new(fx.ctx.clone()).handle(renew()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RenewalNotDue);
    }

    #[tokio::test]
    async fn renewal_inside_window_extends_from_now() {
        let fx = Fixture::new().await;
        let original = subscribe(&fx).await;
        fx.clock.set(original.expires_at.minus_days(3));

        let result = RenewHandler::new(fx.ctx.clone()).handle(renew()).await.unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert_eq!(result.subscription.expires_at, fx.now().add_months(1));
        assert_eq!(result.subscription.renewed_at, Some(fx.now()));
        assert_eq!(result.subscription.tier, original.tier);
        assert!(fx.bus.has_event("subscription.renewed"));
    }

    #[tokio::test]
    async fn pending_renewal_can_always_renew() {
        let fx = Fixture::new().await;
        let mut sub = subscribe(&fx).await;
        sub.mark_renewal_due(fx.now()).unwrap();
        fx.save(&sub).await;

        let result = RenewHandler::new(fx.ctx.clone()).handle(renew()).await.unwrap();
        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert_eq!(result.event.from.as_deref(), Some("PENDING_RENEWAL"));
    }

    #[tokio::test]
    async fn disabled_window_allows_early_renewal() {
        let fx = Fixture::with_policy(MembershipPolicy {
            renewal_window_enabled: false,
            ..Default::default()
        })
        .await;
        subscribe(&fx).await;

        assert!(RenewHandler::new(fx.ctx.clone()).handle(renew()).await.is_ok());
    }

    #[tokio::test]
    async fn no_live_subscription_cannot_renew() {
        let fx = Fixture::new().await;
        let err = RenewHandler::new(fx.ctx.clone()).handle(renew()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoActiveSubscription);
    }
}
