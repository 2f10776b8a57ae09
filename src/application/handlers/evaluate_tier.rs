//! EvaluateTierHandler - Re-evaluates a user's tier from current activity.
//!
//! Used by the scheduled sweep (full evaluation: upgrades and downgrades)
//! and by activity ingestion (upgrade-only, so a single quiet month never
//! demotes anyone between sweeps).

use crate::domain::foundation::UserId;
use crate::domain::membership::{
    MembershipError, Subscription, SubscriptionEvent, TierDecision, TierDirection,
    TierTransition, TransitionCause,
};

use crate::application::HandlerContext;

/// Which moves an evaluation may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Apply whatever the evaluator decides.
    Full,
    /// Apply upgrades only; a downgrade decision is left for the sweep.
    UpgradeOnly,
}

#[derive(Debug, Clone)]
pub struct EvaluateTierCommand {
    pub user_id: UserId,
    pub mode: EvaluationMode,
    pub cause: TransitionCause,
}

impl EvaluateTierCommand {
    /// Full evaluation on behalf of the scheduler.
    pub fn scheduled(user_id: UserId) -> Self {
        Self {
            user_id,
            mode: EvaluationMode::Full,
            cause: TransitionCause::SystemReevaluation,
        }
    }

    /// Upgrade-only evaluation after new activity.
    pub fn after_activity(user_id: UserId) -> Self {
        Self {
            user_id,
            mode: EvaluationMode::UpgradeOnly,
            cause: TransitionCause::ActivityTriggered,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluateTierResult {
    pub subscription: Subscription,
    pub decision: TierDecision,
    /// Set when the decision was applied.
    pub transition: Option<TierTransition>,
}

pub struct EvaluateTierHandler {
    ctx: HandlerContext,
}

impl EvaluateTierHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(
        &self,
        cmd: EvaluateTierCommand,
    ) -> Result<EvaluateTierResult, MembershipError> {
        let lock = self.ctx.locks.acquire(&cmd.user_id).await?;
        let now = self.ctx.clock.now();

        let mut subscription = self.ctx.live_subscription(&cmd.user_id).await?;
        let inputs = self.ctx.eligibility_inputs(&cmd.user_id, now).await?;
        let catalog = self.ctx.catalog.snapshot().await;
        let evaluator = self.ctx.policy.evaluator();

        let decision = evaluator.evaluate(
            &inputs.metrics,
            &inputs.cohorts,
            catalog.ladder(),
            &subscription.tier,
        );

        let apply = match decision.direction {
            TierDirection::Unchanged => false,
            TierDirection::Downgrade => cmd.mode == EvaluationMode::Full,
            TierDirection::Upgrade => true,
        };
        if !apply {
            tracing::debug!(
                user_id = %cmd.user_id,
                current = %subscription.tier.id,
                decided = %decision.tier.id,
                direction = %decision.direction,
                "Tier evaluation left tier unchanged"
            );
            return Ok(EvaluateTierResult {
                subscription,
                decision,
                transition: None,
            });
        }

        let target = catalog
            .tier(decision.new_tier_id())
            .ok_or_else(|| MembershipError::TierNotFound(decision.new_tier_id().clone()))?;
        let transition = subscription.change_tier(target, cmd.cause, now)?;
        self.ctx.subscriptions.update(&subscription).await?;
        drop(lock);

        if let Some(transition) = &transition {
            tracing::info!(
                user_id = %cmd.user_id,
                subscription_id = %subscription.id,
                to = %transition.to.id,
                direction = %decision.direction,
                cause = %cmd.cause,
                orders_in_window = inputs.metrics.orders_in_window,
                monthly_spend = %inputs.metrics.monthly_spend,
                "Tier re-evaluated"
            );
            self.ctx
                .publish(vec![SubscriptionEvent::tier_changed(&subscription, transition)])
                .await;
        }

        Ok(EvaluateTierResult {
            subscription,
            decision,
            transition,
        })
    }
}
