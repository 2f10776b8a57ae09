//! `MembershipService` - the engine's public entry point.
//!
//! A thin facade over the command and query handlers. Each call builds the
//! handler from the shared `HandlerContext`, so the service is cheap to clone
//! and safe to share across tasks.

use crate::domain::catalog::{Plan, PlanFilter, Tier, TierFilter};
use crate::domain::foundation::{PlanId, SubscriptionId, TierId, UserId};
use crate::domain::membership::MembershipError;

use super::handlers::{
    CancelCommand, CancelHandler, CancelResult, DowngradeTierCommand, DowngradeTierHandler,
    EvaluateTierCommand, EvaluateTierHandler, EvaluateTierResult, ExpireOutcome,
    ExpireSubscriptionCommand, ExpireSubscriptionHandler, GetSubscriptionStatusHandler,
    GetSubscriptionStatusQuery, RecordActivityBatchCommand, RecordActivityBatchHandler,
    RecordActivityBatchResult, RecordActivityCommand, RecordActivityHandler,
    RecordActivityResult, RenewCommand, RenewHandler, RenewResult, SubscribeCommand,
    SubscribeHandler, SubscribeResult, SubscriptionStatusView, TierChangeResult,
    UpgradeTierCommand, UpgradeTierHandler,
};
use super::scheduler::{MembershipScheduler, SchedulerSettings};
use super::HandlerContext;

#[derive(Clone)]
pub struct MembershipService {
    ctx: HandlerContext,
}

impl MembershipService {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Scheduler sharing this service's ports and locks.
    pub fn scheduler(&self, settings: SchedulerSettings) -> MembershipScheduler {
        MembershipScheduler::new(self.ctx.clone(), settings)
    }

    // Lifecycle

    pub async fn subscribe(
        &self,
        user_id: UserId,
        plan_id: PlanId,
        tier_id: Option<TierId>,
    ) -> Result<SubscribeResult, MembershipError> {
        SubscribeHandler::new(self.ctx.clone())
            .handle(SubscribeCommand {
                user_id,
                plan_id,
                tier_id,
            })
            .await
    }

    pub async fn upgrade(
        &self,
        user_id: UserId,
        tier_id: TierId,
    ) -> Result<TierChangeResult, MembershipError> {
        UpgradeTierHandler::new(self.ctx.clone())
            .handle(UpgradeTierCommand { user_id, tier_id })
            .await
    }

    pub async fn downgrade(
        &self,
        user_id: UserId,
        tier_id: TierId,
    ) -> Result<TierChangeResult, MembershipError> {
        DowngradeTierHandler::new(self.ctx.clone())
            .handle(DowngradeTierCommand { user_id, tier_id })
            .await
    }

    pub async fn renew(&self, user_id: UserId) -> Result<RenewResult, MembershipError> {
        RenewHandler::new(self.ctx.clone())
            .handle(RenewCommand { user_id })
            .await
    }

    pub async fn cancel(
        &self,
        user_id: UserId,
        reason: Option<String>,
    ) -> Result<CancelResult, MembershipError> {
        CancelHandler::new(self.ctx.clone())
            .handle(CancelCommand { user_id, reason })
            .await
    }

    /// System-triggered; normally driven by the expiry sweep.
    pub async fn expire(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<ExpireOutcome, MembershipError> {
        ExpireSubscriptionHandler::new(self.ctx.clone())
            .handle(ExpireSubscriptionCommand { subscription_id })
            .await
    }

    /// Full re-evaluation, as the scheduled sweep would run it.
    pub async fn evaluate_tier(
        &self,
        user_id: UserId,
    ) -> Result<EvaluateTierResult, MembershipError> {
        EvaluateTierHandler::new(self.ctx.clone())
            .handle(EvaluateTierCommand::scheduled(user_id))
            .await
    }

    // Activity

    pub async fn record_activity(
        &self,
        cmd: RecordActivityCommand,
    ) -> Result<RecordActivityResult, MembershipError> {
        RecordActivityHandler::new(self.ctx.clone()).handle(cmd).await
    }

    pub async fn record_activities(
        &self,
        items: Vec<RecordActivityCommand>,
    ) -> Result<RecordActivityBatchResult, MembershipError> {
        RecordActivityBatchHandler::new(self.ctx.clone())
            .handle(RecordActivityBatchCommand { items })
            .await
    }

    // Queries

    pub async fn subscription_status(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionStatusView, MembershipError> {
        GetSubscriptionStatusHandler::new(self.ctx.clone())
            .handle(GetSubscriptionStatusQuery { user_id })
            .await
    }

    pub async fn list_plans(&self, filter: &PlanFilter) -> Vec<Plan> {
        self.ctx.catalog.list_plans(filter).await
    }

    pub async fn list_tiers(&self, filter: &TierFilter) -> Vec<Tier> {
        self.ctx.catalog.list_tiers(filter).await
    }

    pub async fn get_plan(&self, id: &PlanId) -> Result<Plan, MembershipError> {
        self.ctx.catalog.get_plan(id).await
    }

    pub async fn get_tier(&self, id: &TierId) -> Result<Tier, MembershipError> {
        self.ctx.catalog.get_tier(id).await
    }

    /// Rebuilds the catalog from its source; returns the new version.
    pub async fn reload_catalog(&self) -> Result<u64, MembershipError> {
        self.ctx.catalog.reload().await
    }
}
