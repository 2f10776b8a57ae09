//! Subscription domain events.
//!
//! Raised on every lifecycle and tier transition for downstream notification
//! systems. Events are named in past tense and share one payload shape:
//! `{user_id, subscription_id, from, to, cause, occurred_at}`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, EventId, SubscriptionId, Timestamp, UserId};

use super::{Subscription, SubscriptionStatus, TierTransition};

/// What happened to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEventKind {
    Created,
    TierChanged,
    RenewalDue,
    Renewed,
    Cancelled,
    Expired,
}

impl SubscriptionEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEventKind::Created => "subscription.created",
            SubscriptionEventKind::TierChanged => "subscription.tier_changed",
            SubscriptionEventKind::RenewalDue => "subscription.renewal_due",
            SubscriptionEventKind::Renewed => "subscription.renewed",
            SubscriptionEventKind::Cancelled => "subscription.cancelled",
            SubscriptionEventKind::Expired => "subscription.expired",
        }
    }
}

/// A lifecycle or tier transition of one subscription.
///
/// `from`/`to` hold statuses for lifecycle events and tier ids for
/// `TierChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub event_id: EventId,
    pub kind: SubscriptionEventKind,
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub from: Option<String>,
    pub to: String,
    pub cause: String,
    pub occurred_at: Timestamp,
}

impl SubscriptionEvent {
    fn new(
        kind: SubscriptionEventKind,
        subscription: &Subscription,
        from: Option<String>,
        to: String,
        cause: impl Into<String>,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            kind,
            user_id: subscription.user_id.clone(),
            subscription_id: subscription.id,
            from,
            to,
            cause: cause.into(),
            occurred_at,
        }
    }

    pub fn created(subscription: &Subscription) -> Self {
        Self::new(
            SubscriptionEventKind::Created,
            subscription,
            None,
            subscription.status.to_string(),
            "subscribed",
            subscription.created_at,
        )
    }

    pub fn tier_changed(subscription: &Subscription, transition: &TierTransition) -> Self {
        Self::new(
            SubscriptionEventKind::TierChanged,
            subscription,
            transition.from.as_ref().map(|tier| tier.id.to_string()),
            transition.to.id.to_string(),
            transition.cause.to_string(),
            transition.occurred_at,
        )
    }

    pub fn renewal_due(subscription: &Subscription, now: Timestamp) -> Self {
        Self::status_change(
            SubscriptionEventKind::RenewalDue,
            subscription,
            SubscriptionStatus::Active,
            "renewal window opened",
            now,
        )
    }

    pub fn renewed(subscription: &Subscription, previous: SubscriptionStatus, now: Timestamp) -> Self {
        Self::status_change(
            SubscriptionEventKind::Renewed,
            subscription,
            previous,
            "user requested",
            now,
        )
    }

    pub fn cancelled(subscription: &Subscription, previous: SubscriptionStatus, now: Timestamp) -> Self {
        let cause = subscription
            .cancellation_reason
            .as_ref()
            .map(|reason| reason.as_str().to_string())
            .unwrap_or_else(|| "user requested".to_string());
        Self::status_change(SubscriptionEventKind::Cancelled, subscription, previous, cause, now)
    }

    pub fn expired(subscription: &Subscription, previous: SubscriptionStatus, now: Timestamp) -> Self {
        Self::status_change(
            SubscriptionEventKind::Expired,
            subscription,
            previous,
            "expiry reached",
            now,
        )
    }

    fn status_change(
        kind: SubscriptionEventKind,
        subscription: &Subscription,
        previous: SubscriptionStatus,
        cause: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self::new(
            kind,
            subscription,
            Some(previous.to_string()),
            subscription.status.to_string(),
            cause,
            now,
        )
    }
}

impl DomainEvent for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn aggregate_id(&self) -> String {
        self.subscription_id.to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Subscription"
    }

    fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    fn event_id(&self) -> EventId {
        self.event_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{
        Plan, PlanDefinition, PlanType, Tier, TierBenefits, TierDefinition, TierLevel,
    };
    use crate::domain::foundation::SerializableDomainEvent;
    use crate::domain::membership::{CancellationReason, TransitionCause};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn subscription(now: Timestamp) -> Subscription {
        let plan = Plan::try_from(PlanDefinition {
            id: "monthly".to_string(),
            name: "Monthly".to_string(),
            description: None,
            plan_type: PlanType::Monthly,
            price: dec!(9.99),
            active: true,
        })
        .unwrap();
        Subscription::create(UserId::new("user-1").unwrap(), &plan, &tier("silver", TierLevel::Silver), now)
    }

    fn tier(id: &str, level: TierLevel) -> Tier {
        Tier::try_from(TierDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            level,
            min_orders: 0,
            min_monthly_spend: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            benefits: TierBenefits::default(),
            eligible_cohorts: vec![],
            active: true,
        })
        .unwrap()
    }

    #[test]
    fn created_event_carries_subscription_identity() {
        let now = Timestamp::from_unix_secs(1_704_067_200);
        let sub = subscription(now);
        let event = SubscriptionEvent::created(&sub);
        assert_eq!(event.event_type(), "subscription.created");
        assert_eq!(event.subscription_id, sub.id);
        assert_eq!(event.from, None);
        assert_eq!(event.to, "ACTIVE");
        assert_eq!(event.aggregate_id(), sub.id.to_string());
    }

    #[test]
    fn tier_changed_event_uses_tier_ids_and_cause() {
        let now = Timestamp::from_unix_secs(1_704_067_200);
        let mut sub = subscription(now);
        let transition = sub
            .change_tier(&tier("gold", TierLevel::Gold), TransitionCause::SystemReevaluation, now)
            .unwrap()
            .unwrap();
        let event = SubscriptionEvent::tier_changed(&sub, &transition);
        assert_eq!(event.from.as_deref(), Some("silver"));
        assert_eq!(event.to, "gold");
        assert_eq!(event.cause, "system re-evaluation");
    }

    #[test]
    fn cancelled_event_uses_reason_as_cause() {
        let now = Timestamp::from_unix_secs(1_704_067_200);
        let mut sub = subscription(now);
        sub.cancel(CancellationReason::parse(Some("moving abroad"), 500).unwrap(), now)
            .unwrap();
        let event = SubscriptionEvent::cancelled(&sub, SubscriptionStatus::Active, now);
        assert_eq!(event.from.as_deref(), Some("ACTIVE"));
        assert_eq!(event.to, "CANCELLED");
        assert_eq!(event.cause, "moving abroad");
    }

    #[test]
    fn event_wraps_into_envelope() {
        let now = Timestamp::from_unix_secs(1_704_067_200);
        let sub = subscription(now);
        let envelope = SubscriptionEvent::expired(&sub, SubscriptionStatus::Active, now)
            .to_envelope()
            .unwrap();
        assert_eq!(envelope.event_type, "subscription.expired");
        assert_eq!(envelope.aggregate_type, "Subscription");
        assert_eq!(envelope.schema_version, 1);
        assert_eq!(envelope.payload["user_id"], "user-1");
    }
}
