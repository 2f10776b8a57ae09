//! Membership domain module.
//!
//! Handles the subscription lifecycle and tier evaluation.
//!
//! # Module Structure
//!
//! - `subscription` - Subscription aggregate entity and tier history
//! - `status` - SubscriptionStatus state machine
//! - `evaluator` - Tier eligibility and selection
//! - `errors` - MembershipError taxonomy
//! - `events` - Lifecycle and tier transition events

mod errors;
mod evaluator;
mod events;
mod status;
mod subscription;

pub use errors::MembershipError;
pub use evaluator::{TierDecision, TierDirection, TierEvaluator, TierRef, UnmetRequirement};
pub use events::{SubscriptionEvent, SubscriptionEventKind};
pub use status::SubscriptionStatus;
pub use subscription::{
    CancellationReason, PlanSnapshot, Subscription, TierTransition, TransitionCause,
    TransitionKind,
};
