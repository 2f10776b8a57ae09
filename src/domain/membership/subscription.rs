//! Subscription aggregate entity.
//!
//! A Subscription is one instance of a user's paid membership: the plan
//! terms copied at creation, the tier currently held, the lifecycle status
//! and an append-only history of tier transitions.
//!
//! # Design Decisions
//!
//! - **Plan snapshot**: price and duration are copied at creation so later
//!   catalog edits never alter existing subscriptions
//! - **Injected time**: every mutation takes `now` from the caller's clock
//! - **Fresh instance per subscribe**: CANCELLED and EXPIRED are terminal

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::catalog::{Plan, PlanType, Tier};
use crate::domain::foundation::{
    PlanId, StateMachine, SubscriptionId, Timestamp, UserId, ValidationError,
};

use super::{MembershipError, SubscriptionStatus, TierDirection, TierRef};

/// Plan terms as they were when the subscription was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub plan_id: PlanId,
    pub plan_type: PlanType,
    pub name: String,
    pub price: Decimal,
    pub duration_months: u32,
}

impl From<&Plan> for PlanSnapshot {
    fn from(plan: &Plan) -> Self {
        Self {
            plan_id: plan.id().clone(),
            plan_type: plan.plan_type(),
            name: plan.name().to_string(),
            price: plan.price(),
            duration_months: plan.duration_months(),
        }
    }
}

/// Optional free-text reason recorded on cancellation, length-bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CancellationReason(String);

impl CancellationReason {
    /// Parses an optional reason. Blank input means no reason; input longer
    /// than `max_chars` characters is rejected.
    pub fn parse(raw: Option<&str>, max_chars: usize) -> Result<Option<Self>, ValidationError> {
        let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        if text.chars().count() > max_chars {
            return Err(ValidationError::invalid_format(
                "reason",
                format!("must be at most {} characters", max_chars),
            ));
        }
        Ok(Some(Self(text.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What caused a tier transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Initial assignment at subscribe.
    Subscribed,
    /// Self-service upgrade or downgrade.
    UserRequested,
    /// Scheduled batch re-evaluation.
    SystemReevaluation,
    /// Eager upgrade after new activity.
    ActivityTriggered,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransitionCause::Subscribed => "subscribed",
            TransitionCause::UserRequested => "user requested",
            TransitionCause::SystemReevaluation => "system re-evaluation",
            TransitionCause::ActivityTriggered => "activity triggered",
        };
        write!(f, "{}", s)
    }
}

/// Kind of history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    Assigned,
    Upgrade,
    Downgrade,
}

/// One entry in a subscription's tier history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTransition {
    pub from: Option<TierRef>,
    pub to: TierRef,
    pub kind: TransitionKind,
    pub cause: TransitionCause,
    pub occurred_at: Timestamp,
}

/// Subscription aggregate.
///
/// # Invariants
///
/// - `started_at <= expires_at`
/// - `tier_history` is non-empty, append-only, and its last entry's `to`
///   equals `tier`
/// - `cancelled_at` is set iff status is CANCELLED
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan: PlanSnapshot,
    pub tier: TierRef,
    pub status: SubscriptionStatus,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub renewed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<CancellationReason>,
    pub expired_at: Option<Timestamp>,
    pub tier_history: Vec<TierTransition>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates an ACTIVE subscription with `tier` assigned and expiry one
    /// plan period from `now`.
    pub fn create(user_id: UserId, plan: &Plan, tier: &Tier, now: Timestamp) -> Self {
        let plan = PlanSnapshot::from(plan);
        let tier = TierRef::from(tier);
        let expires_at = now.add_months(plan.duration_months);

        Self {
            id: SubscriptionId::new(),
            user_id,
            tier_history: vec![TierTransition {
                from: None,
                to: tier.clone(),
                kind: TransitionKind::Assigned,
                cause: TransitionCause::Subscribed,
                occurred_at: now,
            }],
            plan,
            tier,
            status: SubscriptionStatus::Active,
            started_at: now,
            expires_at,
            renewed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            expired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True while ACTIVE or PENDING_RENEWAL.
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Whole days until expiry; 0 once expired.
    pub fn days_remaining(&self, now: Timestamp) -> u32 {
        if !now.is_before(&self.expires_at) {
            return 0;
        }
        u32::try_from(self.expires_at.duration_since(&now).num_days()).unwrap_or(u32::MAX)
    }

    /// Start of the renewal window for a window of `window_days`.
    pub fn renewal_window_opens_at(&self, window_days: u32) -> Timestamp {
        self.expires_at.minus_days(i64::from(window_days))
    }

    /// True for an ACTIVE subscription inside its renewal window but not yet
    /// past expiry.
    pub fn is_renewal_due(&self, now: Timestamp, window_days: u32) -> bool {
        self.status == SubscriptionStatus::Active
            && !now.is_before(&self.renewal_window_opens_at(window_days))
            && !self.is_past_expiry(now)
    }

    /// Moves to `target`, recording the transition.
    ///
    /// Returns `None` when `target` is already the current tier; no history
    /// entry is written in that case.
    pub fn change_tier(
        &mut self,
        target: &Tier,
        cause: TransitionCause,
        now: Timestamp,
    ) -> Result<Option<TierTransition>, MembershipError> {
        self.ensure_live()?;

        let to = TierRef::from(target);
        let kind = match TierDirection::between(&self.tier, &to) {
            TierDirection::Unchanged => return Ok(None),
            TierDirection::Upgrade => TransitionKind::Upgrade,
            TierDirection::Downgrade => TransitionKind::Downgrade,
        };

        let transition = TierTransition {
            from: Some(self.tier.clone()),
            to: to.clone(),
            kind,
            cause,
            occurred_at: now,
        };
        self.tier = to;
        self.tier_history.push(transition.clone());
        self.updated_at = now;
        Ok(Some(transition))
    }

    /// Renews for another plan period starting at `now`.
    ///
    /// With `window_days` set, an ACTIVE subscription may only renew once its
    /// renewal window has opened; PENDING_RENEWAL may always renew.
    pub fn renew(&mut self, now: Timestamp, window_days: Option<u32>) -> Result<(), MembershipError> {
        self.ensure_live()?;

        if let (SubscriptionStatus::Active, Some(days)) = (self.status, window_days) {
            let opens_at = self.renewal_window_opens_at(days);
            if now.is_before(&opens_at) {
                return Err(MembershipError::RenewalNotDue {
                    subscription_id: self.id,
                    window_opens_at: opens_at,
                });
            }
        }

        self.status = self.checked_transition(SubscriptionStatus::Active, "renew")?;
        self.expires_at = now.add_months(self.plan.duration_months);
        self.renewed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// ACTIVE → PENDING_RENEWAL.
    pub fn mark_renewal_due(&mut self, now: Timestamp) -> Result<(), MembershipError> {
        self.status = self.checked_transition(SubscriptionStatus::PendingRenewal, "mark renewal due on")?;
        self.updated_at = now;
        Ok(())
    }

    /// Cancels immediately, with no grace period.
    pub fn cancel(
        &mut self,
        reason: Option<CancellationReason>,
        now: Timestamp,
    ) -> Result<(), MembershipError> {
        self.ensure_live()?;
        self.status = self.checked_transition(SubscriptionStatus::Cancelled, "cancel")?;
        self.cancelled_at = Some(now);
        self.cancellation_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    /// Expires a live subscription whose expiry has passed.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), MembershipError> {
        if !self.is_past_expiry(now) {
            return Err(MembershipError::invalid_state(
                format!("{} (expires {})", self.status, self.expires_at.as_datetime().to_rfc3339()),
                "expire",
            ));
        }
        self.status = self.checked_transition(SubscriptionStatus::Expired, "expire")?;
        self.expired_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), MembershipError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(MembershipError::NoActiveSubscription(self.user_id.clone()))
        }
    }

    fn checked_transition(
        &self,
        target: SubscriptionStatus,
        attempted: &str,
    ) -> Result<SubscriptionStatus, MembershipError> {
        self.status
            .transition_to(target)
            .map_err(|_| MembershipError::invalid_state(self.status.to_string(), attempted))
    }
}
