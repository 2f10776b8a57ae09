//! CancelHandler - Command handler for cancelling a subscription.

use crate::domain::foundation::UserId;
use crate::domain::membership::{
    CancellationReason, MembershipError, Subscription, SubscriptionEvent,
};

use crate::application::HandlerContext;

/// Command to cancel the user's live subscription.
#[derive(Debug, Clone)]
pub struct CancelCommand {
    pub user_id: UserId,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CancelResult {
    pub subscription: Subscription,
    pub event: SubscriptionEvent,
}

/// Handler for cancellations. Takes effect immediately.
pub struct CancelHandler {
    ctx: HandlerContext,
}

impl CancelHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, cmd: CancelCommand) -> Result<CancelResult, MembershipError> {
        let reason = CancellationReason::parse(
            cmd.reason.as_deref(),
            self.ctx.policy.cancellation_reason_max_length,
        )?;

        let lock = self.ctx.locks.acquire(&cmd.user_id).await?;
        let now = self.ctx.clock.now();

        let mut subscription = self.ctx.live_subscription(&cmd.user_id).await?;
        let previous = subscription.status;
        subscription.cancel(reason, now)?;
        self.ctx.subscriptions.update(&subscription).await?;
        drop(lock);

        tracing::info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            has_reason = subscription.cancellation_reason.is_some(),
            "Subscription cancelled"
        );

        let event = SubscriptionEvent::cancelled(&subscription, previous, now);
        self.ctx.publish(vec![event.clone()]).await;

        Ok(CancelResult {
            subscription,
            event,
        })
    }
}
