//! Expiry sweep: ends subscriptions past expiry and flags those entering
//! their renewal window.

use futures::stream::{self, StreamExt};

use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::domain::membership::{MembershipError, SubscriptionStatus};

use crate::application::handlers::{
    ExpireOutcome, ExpireSubscriptionCommand, ExpireSubscriptionHandler, MarkRenewalDueCommand,
    MarkRenewalDueHandler,
};
use crate::application::HandlerContext;
use crate::ports::ExpiryCursor;

use super::report::{ExpirySweepReport, SweepReport};
use super::SchedulerSettings;

/// Which transition a sweep phase drives.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Expire,
    MarkRenewalDue,
}

pub struct ExpirySweep {
    ctx: HandlerContext,
    expire: ExpireSubscriptionHandler,
    mark_due: MarkRenewalDueHandler,
    settings: SchedulerSettings,
}

impl ExpirySweep {
    pub fn new(ctx: HandlerContext, settings: SchedulerSettings) -> Self {
        Self {
            expire: ExpireSubscriptionHandler::new(ctx.clone()),
            mark_due: MarkRenewalDueHandler::new(ctx.clone()),
            ctx,
            settings,
        }
    }

    /// One full pass. Expiry runs first so a subscription already past its
    /// end is never flagged as renewal-due.
    ///
    /// Errors only when the repository cannot be queried; per-subscription
    /// failures are counted in the report.
    pub async fn run_once(&self) -> Result<ExpirySweepReport, MembershipError> {
        let now = self.ctx.clock.now();
        let mut report = ExpirySweepReport::default();

        for status in [SubscriptionStatus::Active, SubscriptionStatus::PendingRenewal] {
            let phase = self.sweep(Phase::Expire, status, now).await?;
            report.expirations.merge(phase);
        }

        if let Some(window_days) = self.ctx.policy.renewal_window() {
            let horizon = now.add_days(i64::from(window_days));
            report.renewals_due = self
                .sweep(Phase::MarkRenewalDue, SubscriptionStatus::Active, horizon)
                .await?;
        }

        tracing::info!(
            expired = report.expirations.applied,
            renewals_due = report.renewals_due.applied,
            skipped_busy = report.expirations.skipped_busy + report.renewals_due.skipped_busy,
            failed = report.expirations.failed + report.renewals_due.failed,
            "Expiry sweep finished"
        );
        Ok(report)
    }

    /// Pages through `status` subscriptions expiring before `before`.
    ///
    /// Pages are keyed on `(expires_at, id)`, so rows left untouched (busy
    /// or failed) never hide the ones behind them.
    async fn sweep(
        &self,
        phase: Phase,
        status: SubscriptionStatus,
        before: Timestamp,
    ) -> Result<SweepReport, MembershipError> {
        let limit = self.settings.evaluation_batch_size;
        let mut cursor: Option<ExpiryCursor> = None;
        let mut report = SweepReport::default();

        loop {
            let page = self
                .ctx
                .subscriptions
                .find_expiring_before(status, before, cursor, limit)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(ExpiryCursor::from(last));
            let exhausted = page.len() < limit;

            let ids: Vec<SubscriptionId> = page.iter().map(|sub| sub.id).collect();
            let outcomes: Vec<_> = stream::iter(ids)
                .map(|id| self.process(phase, id))
                .buffer_unordered(self.settings.max_concurrent_tier_evaluations)
                .collect()
                .await;
            for outcome in &outcomes {
                report.record(outcome);
            }

            if exhausted {
                break;
            }
        }

        Ok(report)
    }

    async fn process(
        &self,
        phase: Phase,
        subscription_id: SubscriptionId,
    ) -> Result<Option<()>, MembershipError> {
        let retry = self.settings.busy_retry();
        let outcome = match phase {
            Phase::Expire => retry
                .run(|| self.expire.handle(ExpireSubscriptionCommand { subscription_id }))
                .await
                .map(|outcome| matches!(outcome, ExpireOutcome::Expired(_)).then_some(())),
            Phase::MarkRenewalDue => retry
                .run(|| self.mark_due.handle(MarkRenewalDueCommand { subscription_id }))
                .await
                .map(|marked| marked.then_some(())),
        };

        log_failure(&outcome, subscription_id, phase);
        outcome
    }
}

fn log_failure(
    outcome: &Result<Option<()>, MembershipError>,
    subscription_id: SubscriptionId,
    phase: Phase,
) {
    match outcome {
        Err(MembershipError::Busy(user_id)) => tracing::warn!(
            user_id = %user_id,
            subscription_id = %subscription_id,
            ?phase,
            "User still busy; skipping until next sweep"
        ),
        Err(err) => tracing::error!(
            subscription_id = %subscription_id,
            ?phase,
            error = %err,
            "Expiry sweep failed for subscription"
        ),
        Ok(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{plan, user, Fixture};
    use crate::application::handlers::{SubscribeCommand, SubscribeHandler};
    use crate::application::MembershipPolicy;
    use crate::domain::foundation::{DomainError, UserId};
    use crate::domain::membership::Subscription;
    use crate::ports::SubscriptionRepository;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            evaluation_batch_size: 2,
            busy_retry_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    async fn subscribe(fx: &Fixture, user_id: &str, plan_id: &str) {
        SubscribeHandler::new(fx.ctx.clone())
            .handle(SubscribeCommand {
                user_id: user(user_id),
                plan_id: plan(plan_id),
                tier_id: None,
            })
            .await
            .unwrap();
    }

    async fn status_of(fx: &Fixture, user_id: &str) -> SubscriptionStatus {
        fx.repo
            .find_latest_by_user(&user(user_id))
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn expires_everything_past_expiry_across_pages() {
        let fx = Fixture::new().await;
        for name in ["alice", "bob", "carol", "dave", "erin"] {
            subscribe(&fx, name, "monthly").await;
        }
        subscribe(&fx, "frank", "yearly").await;
        fx.clock.advance_days(40);

        let report = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.expirations.applied, 5);
        assert_eq!(report.expirations.failed, 0);
        for name in ["alice", "bob", "carol", "dave", "erin"] {
            assert_eq!(status_of(&fx, name).await, SubscriptionStatus::Expired);
        }
        assert_eq!(status_of(&fx, "frank").await, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn flags_subscriptions_inside_renewal_window() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "monthly").await;
        subscribe(&fx, "bob", "yearly").await;
        fx.clock.advance_days(25);

        let report = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.renewals_due.applied, 1);
        assert_eq!(report.expirations.applied, 0);
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::PendingRenewal);
        assert_eq!(status_of(&fx, "bob").await, SubscriptionStatus::Active);
        assert!(fx.bus.has_event("subscription.renewal_due"));
    }

    #[tokio::test]
    async fn pending_renewal_subscriptions_expire_too() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "monthly").await;
        fx.clock.advance_days(25);
        let sweep = ExpirySweep::new(fx.ctx.clone(), settings());
        sweep.run_once().await.unwrap();

        fx.clock.advance_days(10);
        let report = sweep.run_once().await.unwrap();

        assert_eq!(report.expirations.applied, 1);
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn disabled_renewal_window_skips_flagging() {
        let fx = Fixture::with_policy(MembershipPolicy {
            lock_timeout: Duration::from_millis(50),
            renewal_window_enabled: false,
            ..Default::default()
        })
        .await;
        subscribe(&fx, "alice", "monthly").await;
        fx.clock.advance_days(25);

        let report = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.renewals_due, SweepReport::default());
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn busy_user_is_skipped_not_failed() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "monthly").await;
        subscribe(&fx, "bob", "monthly").await;
        fx.clock.advance_days(40);

        let held = fx.ctx.locks.acquire(&user("alice")).await.unwrap();
        let report = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();
        drop(held);

        assert_eq!(report.expirations.skipped_busy, 1);
        assert_eq!(report.expirations.applied, 1);
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::Active);

        let retry = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();
        assert_eq!(retry.expirations.applied, 1);
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn page_of_busy_users_does_not_hide_later_expiries() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "monthly").await;
        subscribe(&fx, "bob", "monthly").await;
        fx.clock.advance_days(1);
        subscribe(&fx, "carol", "monthly").await;
        fx.clock.advance_days(40);

        let held_alice = fx.ctx.locks.acquire(&user("alice")).await.unwrap();
        let held_bob = fx.ctx.locks.acquire(&user("bob")).await.unwrap();
        let report = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();
        drop((held_alice, held_bob));

        assert_eq!(report.expirations.skipped_busy, 2);
        assert_eq!(report.expirations.applied, 1);
        assert_eq!(status_of(&fx, "carol").await, SubscriptionStatus::Expired);
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::Active);
    }

    /// Rejects every write to one subscription.
    struct FailingWrites {
        inner: Arc<dyn SubscriptionRepository>,
        stuck: SubscriptionId,
    }

    #[async_trait]
    impl SubscriptionRepository for FailingWrites {
        async fn insert(&self, s: &Subscription) -> Result<(), DomainError> {
            self.inner.insert(s).await
        }
        async fn update(&self, s: &Subscription) -> Result<(), DomainError> {
            if s.id == self.stuck {
                return Err(DomainError::database("row locked by another writer"));
            }
            self.inner.update(s).await
        }
        async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_by_id(id).await
        }
        async fn find_live_by_user(&self, u: &UserId) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_live_by_user(u).await
        }
        async fn find_latest_by_user(&self, u: &UserId) -> Result<Option<Subscription>, DomainError> {
            self.inner.find_latest_by_user(u).await
        }
        async fn find_live_after(
            &self,
            after: Option<&UserId>,
            limit: usize,
        ) -> Result<Vec<Subscription>, DomainError> {
            self.inner.find_live_after(after, limit).await
        }
        async fn find_expiring_before(
            &self,
            status: SubscriptionStatus,
            before: Timestamp,
            after: Option<ExpiryCursor>,
            limit: usize,
        ) -> Result<Vec<Subscription>, DomainError> {
            self.inner.find_expiring_before(status, before, after, limit).await
        }
    }

    #[tokio::test]
    async fn failing_rows_do_not_block_the_queue() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "monthly").await;
        subscribe(&fx, "bob", "monthly").await;
        fx.clock.advance_days(1);
        subscribe(&fx, "carol", "monthly").await;
        fx.clock.advance_days(40);

        let stuck = fx.repo.find_latest_by_user(&user("alice")).await.unwrap().unwrap();
        let mut ctx = fx.ctx.clone();
        ctx.subscriptions = Arc::new(FailingWrites {
            inner: Arc::new(fx.repo.clone()),
            stuck: stuck.id,
        });

        let report = ExpirySweep::new(ctx, settings()).run_once().await.unwrap();

        assert_eq!(report.expirations.failed, 1);
        assert_eq!(report.expirations.applied, 2);
        assert_eq!(status_of(&fx, "alice").await, SubscriptionStatus::Active);
        assert_eq!(status_of(&fx, "bob").await, SubscriptionStatus::Expired);
        assert_eq!(status_of(&fx, "carol").await, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn nothing_due_is_an_empty_report() {
        let fx = Fixture::new().await;
        subscribe(&fx, "alice", "yearly").await;

        let report = ExpirySweep::new(fx.ctx.clone(), settings())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report, ExpirySweepReport::default());
    }
}
