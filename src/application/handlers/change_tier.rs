//! Self-service tier changes.
//!
//! Upgrades must be earned: the evaluator confirms the user meets the target
//! tier's requirements. Downgrades are always permitted. Requesting the tier
//! already held is a no-op reported as `Unchanged`.

use crate::domain::catalog::Tier;
use crate::domain::foundation::{TierId, Timestamp, UserId};
use crate::domain::membership::{
    MembershipError, Subscription, SubscriptionEvent, TierDirection, TierRef, TierTransition,
    TransitionCause, UnmetRequirement,
};

use crate::application::HandlerContext;

/// Command to move to a higher tier.
#[derive(Debug, Clone)]
pub struct UpgradeTierCommand {
    pub user_id: UserId,
    pub tier_id: TierId,
}

/// Command to move to a lower tier.
#[derive(Debug, Clone)]
pub struct DowngradeTierCommand {
    pub user_id: UserId,
    pub tier_id: TierId,
}

/// Outcome of a tier change request.
#[derive(Debug, Clone)]
pub struct TierChangeResult {
    pub subscription: Subscription,
    pub direction: TierDirection,
    /// The history entry written; `None` when unchanged.
    pub transition: Option<TierTransition>,
}

/// Handler for user-requested upgrades.
pub struct UpgradeTierHandler {
    ctx: HandlerContext,
}

impl UpgradeTierHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: UpgradeTierCommand) -> Result<TierChangeResult, MembershipError> {
        change_tier(&self.ctx, cmd.user_id, cmd.tier_id, TierDirection::Upgrade).await
    }
}

/// Handler for user-requested downgrades.
pub struct DowngradeTierHandler {
    ctx: HandlerContext,
}

impl DowngradeTierHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: DowngradeTierCommand,
    ) -> Result<TierChangeResult, MembershipError> {
        change_tier(&self.ctx, cmd.user_id, cmd.tier_id, TierDirection::Downgrade).await
    }
}

async fn change_tier(
    ctx: &HandlerContext,
    user_id: UserId,
    tier_id: TierId,
    expected: TierDirection,
) -> Result<TierChangeResult, MembershipError> {
    let lock = ctx.locks.acquire(&user_id).await?;
    let now = ctx.clock.now();

    let current = ctx.live_subscription(&user_id).await?;
    let catalog = ctx.catalog.snapshot().await;
    let target = catalog
        .tier(&tier_id)
        .ok_or_else(|| MembershipError::TierNotFound(tier_id.clone()))?;

    let direction = TierDirection::between(&current.tier, &TierRef::from(target));
    if direction == TierDirection::Unchanged {
        return Ok(TierChangeResult {
            subscription: current,
            direction,
            transition: None,
        });
    }
    if direction != expected {
        return Err(MembershipError::invalid_tier_change(
            current.tier.id.clone(),
            tier_id,
            format!("{} requested but the target is a {}", expected, direction),
        ));
    }

    ensure_allowed(ctx, &user_id, target, direction, now).await?;

    // Mutate a copy so a failed write leaves nothing half-applied.
    let mut subscription = current;
    let transition = subscription.change_tier(target, TransitionCause::UserRequested, now)?;
    ctx.subscriptions.update(&subscription).await?;
    drop(lock);

    if let Some(transition) = &transition {
        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            from = ?transition.from.as_ref().map(|t| t.id.as_str()),
            to = %transition.to.id,
            direction = %direction,
            "Tier changed by user request"
        );
        ctx.publish(vec![SubscriptionEvent::tier_changed(&subscription, transition)])
            .await;
    }

    Ok(TierChangeResult {
        subscription,
        direction,
        transition,
    })
}

async fn ensure_allowed(
    ctx: &HandlerContext,
    user_id: &UserId,
    target: &Tier,
    direction: TierDirection,
    now: Timestamp,
) -> Result<(), MembershipError> {
    match direction {
        TierDirection::Upgrade => {
            let inputs = ctx.eligibility_inputs(user_id, now).await?;
            ctx.policy
                .evaluator()
                .check_eligibility(target, &inputs.metrics, &inputs.cohorts)
                .map_err(|unmet| {
                    MembershipError::tier_not_eligible(user_id.clone(), target.id().clone(), unmet)
                })
        }
        // Thresholds don't apply going down, but the tier must still be offered.
        _ if !target.is_active() => Err(MembershipError::tier_not_eligible(
            user_id.clone(),
            target.id().clone(),
            vec![UnmetRequirement::Inactive],
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{plan, tier, user, Fixture};
    use crate::application::handlers::{SubscribeCommand, SubscribeHandler};
    use crate::domain::foundation::ErrorCode;
    use crate::domain::membership::TransitionKind;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn subscribed(fx: &Fixture, user_id: &str, tier_id: &str) {
        SubscribeHandler::new(fx.ctx.clone())
            .handle(SubscribeCommand {
                user_id: user(user_id),
                plan_id: plan("monthly"),
                tier_id: Some(tier(tier_id)),
            })
            .await
            .unwrap();
    }

    fn upgrade(user_id: &str, tier_id: &str) -> UpgradeTierCommand {
        UpgradeTierCommand {
            user_id: user(user_id),
            tier_id: tier(tier_id),
        }
    }

    fn downgrade(user_id: &str, tier_id: &str) -> DowngradeTierCommand {
        DowngradeTierCommand {
            user_id: user(user_id),
            tier_id: tier(tier_id),
        }
    }

    #[tokio::test]
    async fn upgrade_requires_eligibility() {
        let fx = Fixture::new().await;
        subscribed(&fx, "alice", "silver").await;
        let handler = UpgradeTierHandler::new(fx.ctx.clone());

        let err = handler.handle(upgrade("alice", "gold")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TierNotEligible);

        fx.record_orders(&user("alice"), 6, dec!(150)).await;
        let result = handler.handle(upgrade("alice", "gold")).await.unwrap();

        assert_eq!(result.direction, TierDirection::Upgrade);
        assert_eq!(result.subscription.tier.id, tier("gold"));
        let entry = result.transition.unwrap();
        assert_eq!(entry.kind, TransitionKind::Upgrade);
        assert_eq!(entry.cause, TransitionCause::UserRequested);
        assert!(fx.bus.has_event("subscription.tier_changed"));
    }

    #[tokio::test]
    async fn downgrade_is_always_permitted() {
        let fx = Fixture::new().await;
        fx.record_orders(&user("alice"), 20, dec!(600)).await;
        subscribed(&fx, "alice", "platinum").await;

        let result = DowngradeTierHandler::new(fx.ctx.clone())
            .handle(downgrade("alice", "silver"))
            .await
            .unwrap();

        assert_eq!(result.direction, TierDirection::Downgrade);
        assert_eq!(result.subscription.tier_history.len(), 2);
    }

    #[tokio::test]
    async fn same_tier_is_unchanged_without_history() {
        let fx = Fixture::new().await;
        subscribed(&fx, "alice", "silver").await;

        let result = DowngradeTierHandler::new(fx.ctx.clone())
            .handle(downgrade("alice", "silver"))
            .await
            .unwrap();

        assert_eq!(result.direction, TierDirection::Unchanged);
        assert!(result.transition.is_none());
        assert_eq!(result.subscription.tier_history.len(), 1);
        assert!(!fx.bus.has_event("subscription.tier_changed"));
    }

    #[tokio::test]
    async fn wrong_direction_is_rejected() {
        let fx = Fixture::new().await;
        fx.record_orders(&user("alice"), 6, dec!(150)).await;
        subscribed(&fx, "alice", "gold").await;

        let err = UpgradeTierHandler::new(fx.ctx.clone())
            .handle(upgrade("alice", "silver"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTierChange);

        let err = DowngradeTierHandler::new(fx.ctx.clone())
            .handle(downgrade("alice", "platinum"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTierChange);
    }

    #[tokio::test]
    async fn no_subscription_is_rejected() {
        let fx = Fixture::new().await;
        let err = UpgradeTierHandler::new(fx.ctx.clone())
            .handle(upgrade("nobody", "gold"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoActiveSubscription);
    }

    #[tokio::test]
    async fn busy_user_fails_fast() {
        let fx = Fixture::new().await;
        subscribed(&fx, "alice", "silver").await;
        let _held = fx.ctx.locks.acquire(&user("alice")).await.unwrap();

        let err = DowngradeTierHandler::new(fx.ctx.clone())
            .handle(downgrade("alice", "silver"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Busy);
    }

    #[tokio::test]
    async fn failed_write_leaves_subscription_untouched() {
        use crate::domain::foundation::{DomainError, SubscriptionId};
        use crate::domain::membership::SubscriptionStatus;
        use crate::ports::{ExpiryCursor, SubscriptionRepository};
        use async_trait::async_trait;

        struct ReadOnly(Arc<dyn SubscriptionRepository>);

        #[async_trait]
        impl SubscriptionRepository for ReadOnly {
            async fn insert(&self, s: &Subscription) -> Result<(), DomainError> {
                self.0.insert(s).await
            }
            async fn update(&self, _: &Subscription) -> Result<(), DomainError> {
                Err(DomainError::database("disk full"))
            }
            async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
                self.0.find_by_id(id).await
            }
            async fn find_live_by_user(&self, u: &UserId) -> Result<Option<Subscription>, DomainError> {
                self.0.find_live_by_user(u).await
            }
            async fn find_latest_by_user(&self, u: &UserId) -> Result<Option<Subscription>, DomainError> {
                self.0.find_latest_by_user(u).await
            }
            async fn find_live_after(
                &self,
                after: Option<&UserId>,
                limit: usize,
            ) -> Result<Vec<Subscription>, DomainError> {
                self.0.find_live_after(after, limit).await
            }
            async fn find_expiring_before(
                &self,
                status: SubscriptionStatus,
                before: Timestamp,
                after: Option<ExpiryCursor>,
                limit: usize,
            ) -> Result<Vec<Subscription>, DomainError> {
                self.0.find_expiring_before(status, before, after, limit).await
            }
        }

        let fx = Fixture::new().await;
        fx.record_orders(&user("alice"), 20, dec!(600)).await;
        subscribed(&fx, "alice", "platinum").await;
        let mut ctx = fx.ctx.clone();
        ctx.subscriptions = Arc::new(ReadOnly(Arc::new(fx.repo.clone())));

        let err = DowngradeTierHandler::new(ctx)
            .handle(downgrade("alice", "gold"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "Internal error");
        let stored = fx.ctx.live_subscription(&user("alice")).await.unwrap();
        assert_eq!(stored.tier.id, tier("platinum"));
        assert_eq!(stored.tier_history.len(), 1);
        assert_eq!(fx.bus.events_of_type("subscription.tier_changed").len(), 0);
    }
}
