//! Subscription status state machine.
//!
//! ```text
//! ACTIVE ──► PENDING_RENEWAL ──► ACTIVE (renewed)
//!   │  ▲            │
//!   │  └─ renew     ├──► EXPIRED
//!   ├──► CANCELLED  └──► CANCELLED
//!   └──► EXPIRED
//! ```
//!
//! `CANCELLED` and `EXPIRED` are terminal for a subscription instance; a new
//! `subscribe` creates a fresh one.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of one subscription instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Paid up and within its billing period.
    Active,

    /// Inside the renewal window, awaiting renewal.
    PendingRenewal,

    /// Cancelled by the user; no grace period.
    Cancelled,

    /// Billing period ended without renewal.
    Expired,
}

impl SubscriptionStatus {
    /// True for the statuses covered by the one-subscription-per-user
    /// invariant.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::PendingRenewal
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::PendingRenewal => "PENDING_RENEWAL",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use SubscriptionStatus::*;
        match self {
            Active => &[Active, PendingRenewal, Cancelled, Expired],
            PendingRenewal => &[Active, Expired, Cancelled],
            Cancelled => &[],
            Expired => &[],
        }
    }
}
