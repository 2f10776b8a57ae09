//! Membership-specific error types.
//!
//! Every variant maps to a stable [`ErrorCode`] and a human-readable message.
//! Infrastructure failures keep their detail for logs, but the message shown
//! to callers stays generic.
//!
//! | Error | Retryable |
//! |-------|-----------|
//! | PlanNotFound / TierNotFound / SubscriptionNotFound | no |
//! | ActiveSubscriptionExists / NoActiveSubscription | no |
//! | TierNotEligible / InvalidTierChange / RenewalNotDue | no |
//! | InvalidActivity / BatchTooLarge / ValidationFailed | no |
//! | InvalidState | no |
//! | Busy | yes |
//! | Infrastructure | yes |

use crate::domain::activity::ActivityRejection;
use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, TierId, Timestamp, UserId, ValidationError,
};

use super::UnmetRequirement;

/// Membership-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// Plan id is not in the catalog.
    PlanNotFound(PlanId),

    /// Tier id is not in the catalog.
    TierNotFound(TierId),

    /// Subscription instance does not exist.
    SubscriptionNotFound(SubscriptionId),

    /// User has never subscribed.
    NoSubscriptionForUser(UserId),

    /// User already holds an ACTIVE or PENDING_RENEWAL subscription.
    ActiveSubscriptionExists(UserId),

    /// User holds no ACTIVE or PENDING_RENEWAL subscription.
    NoActiveSubscription(UserId),

    /// Requested tier's requirements are not met.
    TierNotEligible {
        user_id: UserId,
        tier_id: TierId,
        unmet: Vec<UnmetRequirement>,
    },

    /// Requested tier move goes the wrong way for the operation.
    InvalidTierChange {
        from: TierId,
        to: TierId,
        reason: String,
    },

    /// Activity rejected at ingestion.
    InvalidActivity(String),

    /// Activity batch exceeds the configured maximum.
    BatchTooLarge { size: usize, max: usize },

    /// Renewal requested before the renewal window opened.
    RenewalNotDue {
        subscription_id: SubscriptionId,
        window_opens_at: Timestamp,
    },

    /// Invalid state for the requested operation.
    InvalidState { current: String, attempted: String },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// The user's lock could not be acquired in time.
    Busy(UserId),

    /// Infrastructure error.
    Infrastructure(String),
}

impl MembershipError {
    pub fn tier_not_eligible(user_id: UserId, tier_id: TierId, unmet: Vec<UnmetRequirement>) -> Self {
        MembershipError::TierNotEligible {
            user_id,
            tier_id,
            unmet,
        }
    }

    pub fn invalid_tier_change(from: TierId, to: TierId, reason: impl Into<String>) -> Self {
        MembershipError::InvalidTierChange {
            from,
            to,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        MembershipError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MembershipError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        MembershipError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MembershipError::PlanNotFound(_) => ErrorCode::PlanNotFound,
            MembershipError::TierNotFound(_) => ErrorCode::TierNotFound,
            MembershipError::SubscriptionNotFound(_) | MembershipError::NoSubscriptionForUser(_) => {
                ErrorCode::SubscriptionNotFound
            }
            MembershipError::ActiveSubscriptionExists(_) => ErrorCode::ActiveSubscriptionExists,
            MembershipError::NoActiveSubscription(_) => ErrorCode::NoActiveSubscription,
            MembershipError::TierNotEligible { .. } => ErrorCode::TierNotEligible,
            MembershipError::InvalidTierChange { .. } => ErrorCode::InvalidTierChange,
            MembershipError::InvalidActivity(_) => ErrorCode::InvalidActivity,
            MembershipError::BatchTooLarge { .. } => ErrorCode::BatchTooLarge,
            MembershipError::RenewalNotDue { .. } => ErrorCode::RenewalNotDue,
            MembershipError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            MembershipError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MembershipError::Busy(_) => ErrorCode::Busy,
            MembershipError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            MembershipError::PlanNotFound(id) => format!("Plan not found: {}", id),
            MembershipError::TierNotFound(id) => format!("Tier not found: {}", id),
            MembershipError::SubscriptionNotFound(id) => {
                format!("Subscription not found: {}", id)
            }
            MembershipError::NoSubscriptionForUser(user_id) => {
                format!("No subscription found for user: {}", user_id)
            }
            MembershipError::ActiveSubscriptionExists(user_id) => {
                format!("User {} already has an active subscription", user_id)
            }
            MembershipError::NoActiveSubscription(user_id) => {
                format!("No active subscription found for user: {}", user_id)
            }
            MembershipError::TierNotEligible {
                user_id,
                tier_id,
                unmet,
            } => {
                let reasons: Vec<String> = unmet.iter().map(ToString::to_string).collect();
                format!(
                    "User {} does not meet requirements for {} tier: {}",
                    user_id,
                    tier_id,
                    reasons.join("; ")
                )
            }
            MembershipError::InvalidTierChange { from, to, reason } => {
                format!("Cannot change tier from {} to {}: {}", from, to, reason)
            }
            MembershipError::InvalidActivity(reason) => format!("Invalid activity: {}", reason),
            MembershipError::BatchTooLarge { size, max } => {
                format!("Activity batch of {} exceeds the maximum of {}", size, max)
            }
            MembershipError::RenewalNotDue {
                subscription_id,
                window_opens_at,
            } => format!(
                "Subscription {} cannot be renewed before {}",
                subscription_id,
                window_opens_at.as_datetime().to_rfc3339()
            ),
            MembershipError::InvalidState { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            MembershipError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            MembershipError::Busy(user_id) => format!(
                "Another operation is in progress for user {}; retry shortly",
                user_id
            ),
            MembershipError::Infrastructure(_) => "Internal error".to_string(),
        }
    }

    /// Internal detail for logs; same as `message()` except for
    /// infrastructure failures.
    pub fn detail(&self) -> String {
        match self {
            MembershipError::Infrastructure(detail) => detail.clone(),
            other => other.message(),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MembershipError::Busy(_) | MembershipError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for MembershipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MembershipError {}

impl From<DomainError> for MembershipError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => MembershipError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            // Raised by repositories enforcing the one-live-subscription rule.
            ErrorCode::ActiveSubscriptionExists => {
                let user_id = err.details.get("user_id").map(|id| UserId::new(id.as_str()));
                match user_id {
                    Some(Ok(user_id)) => MembershipError::ActiveSubscriptionExists(user_id),
                    _ => MembershipError::Infrastructure(err.to_string()),
                }
            }
            _ => MembershipError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for MembershipError {
    fn from(err: ValidationError) -> Self {
        MembershipError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ActivityRejection> for MembershipError {
    fn from(err: ActivityRejection) -> Self {
        MembershipError::InvalidActivity(err.to_string())
    }
}

impl From<MembershipError> for DomainError {
    fn from(err: MembershipError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
