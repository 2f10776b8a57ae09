//! Membership handlers.
//!
//! ## Commands
//! - Subscribing, upgrading, downgrading, renewing and cancelling
//! - Expiring and flagging renewal-due subscriptions (system-triggered)
//! - Re-evaluating a user's tier
//! - Recording activity, singly or in batches
//!
//! ## Queries
//! - Subscription status for a user
//!
//! Every command that changes a subscription holds the user's lock for the
//! whole read-modify-write, mutates a copy, persists it, and only then
//! publishes events.

mod cancel;
mod change_tier;
mod evaluate_tier;
mod expire;
mod get_subscription_status;
mod record_activity;
mod renew;
mod subscribe;

#[cfg(test)]
pub(crate) mod test_support;

// Commands
pub use cancel::{CancelCommand, CancelHandler, CancelResult};
pub use change_tier::{
    DowngradeTierCommand, DowngradeTierHandler, TierChangeResult, UpgradeTierCommand,
    UpgradeTierHandler,
};
pub use evaluate_tier::{
    EvaluateTierCommand, EvaluateTierHandler, EvaluateTierResult, EvaluationMode,
};
pub use expire::{
    ExpireOutcome, ExpireSubscriptionCommand, ExpireSubscriptionHandler, MarkRenewalDueCommand,
    MarkRenewalDueHandler,
};
pub use record_activity::{
    RecordActivityBatchCommand, RecordActivityBatchHandler, RecordActivityBatchResult,
    RecordActivityCommand, RecordActivityHandler, RecordActivityResult,
};
pub use renew::{RenewCommand, RenewHandler, RenewResult};
pub use subscribe::{SubscribeCommand, SubscribeHandler, SubscribeResult};

// Queries
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, SubscriptionStatusView,
};
