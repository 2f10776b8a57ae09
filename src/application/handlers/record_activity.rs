//! Activity ingestion.
//!
//! Recording never takes the user's subscription lock: the store applies
//! increments atomically, so ingestion runs alongside lifecycle operations.
//! When eager upgrades are enabled an ORDER triggers an upgrade-only
//! evaluation; a busy or missing subscription just defers the upgrade to
//! the next sweep.

use std::collections::BTreeSet;

use crate::domain::activity::{Activity, ActivityType};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::membership::{MembershipError, TierTransition};

use super::{EvaluateTierCommand, EvaluateTierHandler};
use crate::application::HandlerContext;

/// One activity as reported by the caller.
#[derive(Debug, Clone)]
pub struct RecordActivityCommand {
    pub user_id: UserId,
    /// One of ORDER, RETURN, REVIEW, REFERRAL (case-insensitive).
    pub activity_type: String,
    pub value: f64,
    /// When the activity happened; defaults to now.
    pub occurred_at: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct RecordActivityResult {
    pub activity: Activity,
    /// Upgrade applied as a consequence, if any.
    pub tier_change: Option<TierTransition>,
}

/// Several activities, validated as a unit.
#[derive(Debug, Clone, Default)]
pub struct RecordActivityBatchCommand {
    pub items: Vec<RecordActivityCommand>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordActivityBatchResult {
    pub recorded: usize,
    pub tier_changes: Vec<TierTransition>,
}

pub struct RecordActivityHandler {
    ctx: HandlerContext,
    evaluate: EvaluateTierHandler,
}

impl RecordActivityHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            evaluate: EvaluateTierHandler::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn handle(
        &self,
        cmd: RecordActivityCommand,
    ) -> Result<RecordActivityResult, MembershipError> {
        let now = self.ctx.clock.now();
        let activity = admit(&self.ctx, cmd, now)?;

        let retain_from = self.ctx.policy.activity_policy().retention_start(now);
        self.ctx.activity.record(&activity, retain_from, now).await?;

        tracing::debug!(
            user_id = %activity.user_id,
            activity_type = %activity.activity_type,
            value = %activity.value,
            month = %activity.month(),
            "Activity recorded"
        );

        let tier_change = if triggers_upgrade(&self.ctx, &activity) {
            eager_upgrade(&self.evaluate, &activity.user_id).await
        } else {
            None
        };

        Ok(RecordActivityResult {
            activity,
            tier_change,
        })
    }
}

pub struct RecordActivityBatchHandler {
    ctx: HandlerContext,
    evaluate: EvaluateTierHandler,
}

impl RecordActivityBatchHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            evaluate: EvaluateTierHandler::new(ctx.clone()),
            ctx,
        }
    }

    /// Validates every item first; nothing is recorded unless all pass.
    pub async fn handle(
        &self,
        cmd: RecordActivityBatchCommand,
    ) -> Result<RecordActivityBatchResult, MembershipError> {
        let max = self.ctx.policy.max_activity_batch_size;
        if cmd.items.len() > max {
            return Err(MembershipError::BatchTooLarge {
                size: cmd.items.len(),
                max,
            });
        }

        let now = self.ctx.clock.now();
        let activities = cmd
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                admit(&self.ctx, item, now).map_err(|e| match e {
                    MembershipError::InvalidActivity(reason) => {
                        MembershipError::InvalidActivity(format!("item {}: {}", index, reason))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if activities.is_empty() {
            return Ok(RecordActivityBatchResult::default());
        }

        let retain_from = self.ctx.policy.activity_policy().retention_start(now);
        self.ctx.activity.record_all(&activities, retain_from, now).await?;
        tracing::debug!(count = activities.len(), "Activity batch recorded");

        let upgrade_candidates: BTreeSet<&UserId> = activities
            .iter()
            .filter(|activity| triggers_upgrade(&self.ctx, activity))
            .map(|activity| &activity.user_id)
            .collect();

        let mut tier_changes = Vec::new();
        for user_id in upgrade_candidates {
            if let Some(change) = eager_upgrade(&self.evaluate, user_id).await {
                tier_changes.push(change);
            }
        }

        Ok(RecordActivityBatchResult {
            recorded: activities.len(),
            tier_changes,
        })
    }
}

fn admit(
    ctx: &HandlerContext,
    cmd: RecordActivityCommand,
    now: Timestamp,
) -> Result<Activity, MembershipError> {
    let activity_type: ActivityType = cmd.activity_type.parse()?;
    let activity = Activity::new(
        cmd.user_id,
        activity_type,
        cmd.value,
        cmd.occurred_at.unwrap_or(now),
    )?;
    ctx.policy.activity_policy().admit(&activity, now)?;
    Ok(activity)
}

fn triggers_upgrade(ctx: &HandlerContext, activity: &Activity) -> bool {
    ctx.policy.eager_upgrades && activity.activity_type == ActivityType::Order
}

async fn eager_upgrade(evaluate: &EvaluateTierHandler, user_id: &UserId) -> Option<TierTransition> {
    match evaluate
        .handle(EvaluateTierCommand::after_activity(user_id.clone()))
        .await
    {
        Ok(result) => result.transition,
        Err(MembershipError::NoActiveSubscription(_)) => None,
        Err(MembershipError::Busy(_)) => {
            tracing::warn!(user_id = %user_id, "User busy; eager upgrade deferred to next sweep");
            None
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e.detail(), "Eager tier evaluation failed");
            None
        }
    }
}
