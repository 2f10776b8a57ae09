//! SubscribeHandler - Command handler for starting a subscription.

use crate::domain::foundation::{PlanId, TierId, UserId};
use crate::domain::membership::{MembershipError, Subscription, SubscriptionEvent};

use crate::application::HandlerContext;

/// Command to start a subscription.
///
/// Without `tier_id` the user starts on the baseline tier.
#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub tier_id: Option<TierId>,
}

/// Result of a successful subscribe.
#[derive(Debug, Clone)]
pub struct SubscribeResult {
    pub subscription: Subscription,
    pub event: SubscriptionEvent,
}

/// Handler for starting subscriptions.
pub struct SubscribeHandler {
    ctx: HandlerContext,
}

impl SubscribeHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: SubscribeCommand) -> Result<SubscribeResult, MembershipError> {
        let lock = self.ctx.locks.acquire(&cmd.user_id).await?;
        let now = self.ctx.clock.now();

        // 1. One live subscription per user
        if self
            .ctx
            .subscriptions
            .find_live_by_user(&cmd.user_id)
            .await?
            .is_some()
        {
            return Err(MembershipError::ActiveSubscriptionExists(cmd.user_id));
        }

        // 2. Resolve plan and tier against one snapshot
        let catalog = self.ctx.catalog.snapshot().await;
        let plan = catalog
            .plan(&cmd.plan_id)
            .ok_or_else(|| MembershipError::PlanNotFound(cmd.plan_id.clone()))?;
        if !plan.is_active() {
            return Err(MembershipError::validation(
                "plan_id",
                format!("plan {} is not currently offered", plan.id()),
            ));
        }

        let baseline = catalog.ladder().baseline();
        let tier = match &cmd.tier_id {
            None => baseline,
            Some(id) if id == baseline.id() => baseline,
            Some(id) => {
                let tier = catalog
                    .tier(id)
                    .ok_or_else(|| MembershipError::TierNotFound(id.clone()))?;
                let inputs = self.ctx.eligibility_inputs(&cmd.user_id, now).await?;
                self.ctx
                    .policy
                    .evaluator()
                    .check_eligibility(tier, &inputs.metrics, &inputs.cohorts)
                    .map_err(|unmet| {
                        MembershipError::tier_not_eligible(cmd.user_id.clone(), id.clone(), unmet)
                    })?;
                tier
            }
        };

        // 3. Create and persist
        let subscription = Subscription::create(cmd.user_id, plan, tier, now);
        self.ctx.subscriptions.insert(&subscription).await?;
        drop(lock);

        tracing::info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            plan_id = %subscription.plan.plan_id,
            tier_id = %subscription.tier.id,
            "Subscription created"
        );

        // 4. Publish
        let event = SubscriptionEvent::created(&subscription);
        self.ctx.publish(vec![event.clone()]).await;

        Ok(SubscribeResult {
            subscription,
            event,
        })
    }
}
