//! Scheduled tier re-evaluation over every live subscription.

use futures::stream::{self, StreamExt};

use crate::domain::foundation::UserId;
use crate::domain::membership::MembershipError;

use crate::application::handlers::{EvaluateTierCommand, EvaluateTierHandler};
use crate::application::HandlerContext;

use super::report::SweepReport;
use super::SchedulerSettings;

/// Walks live subscriptions in user-id order, one batch at a time, and runs
/// a full evaluation for each user.
///
/// Within a batch at most `max_concurrent_tier_evaluations` evaluations are
/// in flight, so the sweep never holds more user locks than that.
pub struct TierEvaluationSweep {
    ctx: HandlerContext,
    evaluate: EvaluateTierHandler,
    settings: SchedulerSettings,
}

impl TierEvaluationSweep {
    pub fn new(ctx: HandlerContext, settings: SchedulerSettings) -> Self {
        Self {
            evaluate: EvaluateTierHandler::new(ctx.clone()),
            ctx,
            settings,
        }
    }

    pub async fn run_once(&self) -> Result<SweepReport, MembershipError> {
        let batch_size = self.settings.evaluation_batch_size;
        let mut cursor: Option<UserId> = None;
        let mut report = SweepReport::default();
        let mut batches = 0usize;

        loop {
            let page = self
                .ctx
                .subscriptions
                .find_live_after(cursor.as_ref(), batch_size)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.user_id.clone());
            let exhausted = page.len() < batch_size;

            let outcomes: Vec<_> = stream::iter(page.into_iter().map(|s| s.user_id))
                .map(|user_id| self.evaluate_user(user_id))
                .buffer_unordered(self.settings.max_concurrent_tier_evaluations)
                .collect()
                .await;
            for outcome in &outcomes {
                report.record(outcome);
            }
            batches += 1;

            if exhausted {
                break;
            }
        }

        tracing::info!(
            batches,
            examined = report.examined,
            changed = report.applied,
            skipped_busy = report.skipped_busy,
            failed = report.failed,
            "Tier evaluation sweep finished"
        );
        Ok(report)
    }

    async fn evaluate_user(&self, user_id: UserId) -> Result<Option<()>, MembershipError> {
        let outcome = self
            .settings
            .busy_retry()
            .run(|| {
                self.evaluate
                    .handle(EvaluateTierCommand::scheduled(user_id.clone()))
            })
            .await;

        match outcome {
            Ok(result) => Ok(result.transition.map(|_| ())),
            // Cancelled or expired since the page was read.
            Err(MembershipError::NoActiveSubscription(_)) => Ok(None),
            Err(MembershipError::Busy(user_id)) => {
                tracing::warn!(user_id = %user_id, "User still busy; skipping until next sweep");
                Err(MembershipError::Busy(user_id))
            }
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "Tier evaluation failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{plan, tier, user, Fixture};
    use crate::application::handlers::{SubscribeCommand, SubscribeHandler};
    use crate::ports::SubscriptionRepository;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            evaluation_batch_size: 2,
            max_concurrent_tier_evaluations: 2,
            busy_retry_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    async fn subscribe(fx: &Fixture, user_id: &str, tier_id: &str) {
        SubscribeHandler::new(fx.ctx.clone())
            .handle(SubscribeCommand {
                user_id: user(user_id),
                plan_id: plan("yearly"),
                tier_id: Some(tier(tier_id)),
            })
            .await
            .unwrap();
    }

    async fn tier_of(fx: &Fixture, user_id: &str) -> String {
        fx.repo
            .find_live_by_user(&user(user_id))
            .await
            .unwrap()
            .unwrap()
            .tier
            .id
            .to_string()
    }

    #[tokio::test]
    async fn evaluates_every_live_subscription() {
        let fx = Fixture::new().await;
        for name in ["alice", "bob", "carol", "dave", "erin"] {
            subscribe(&fx, name, "silver").await;
        }
        fx.record_orders(&user("bob"), 6, dec!(150)).await;
        fx.record_orders(&user("erin"), 20, dec!(900)).await;

        let report = TierEvaluationSweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.examined, 5);
        assert_eq!(report.applied, 2);
        assert_eq!(report.unchanged, 3);
        assert_eq!(tier_of(&fx, "bob").await, "gold");
        assert_eq!(tier_of(&fx, "erin").await, "platinum");
        assert_eq!(tier_of(&fx, "alice").await, "silver");
    }

    #[tokio::test]
    async fn demotes_users_whose_spend_dropped() {
        let fx = Fixture::new().await;
        fx.record_orders(&user("alice"), 6, dec!(150)).await;
        subscribe(&fx, "alice", "gold").await;
        fx.clock.advance_days(31);

        let report = TierEvaluationSweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(tier_of(&fx, "alice").await, "silver");
        assert!(fx.bus.has_event("subscription.tier_changed"));
    }

    #[tokio::test]
    async fn busy_users_are_skipped_for_the_cycle() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "silver").await;
        subscribe(&fx, "bob", "silver").await;
        fx.record_orders(&user("alice"), 6, dec!(150)).await;

        let held = fx.ctx.locks.acquire(&user("alice")).await.unwrap();
        let report = TierEvaluationSweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();
        drop(held);

        assert_eq!(report.skipped_busy, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(tier_of(&fx, "alice").await, "silver");
    }

    #[tokio::test]
    async fn empty_repository_is_an_empty_report() {
        let fx = Fixture::new().await;
        let report = TierEvaluationSweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();
        assert_eq!(report, SweepReport::default());
    }
}
