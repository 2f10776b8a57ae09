//! Subscription repository port.
//!
//! Defines the contract for persisting and retrieving Subscription
//! aggregates.
//!
//! # Design
//!
//! - **One live subscription per user**: `insert` refuses a second
//!   ACTIVE/PENDING_RENEWAL subscription for the same user
//! - **Whole-aggregate writes**: `update` replaces the stored aggregate, so a
//!   failed write leaves the previous state untouched
//! - **Keyset scans**: batch jobs page through live subscriptions by user id,
//!   and through expiring ones by `(expires_at, id)`

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::domain::membership::{Subscription, SubscriptionStatus};

/// Position in an expiry scan: the last row of the previous page.
///
/// Ordering follows the fields, so rows sort by `expires_at` then `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpiryCursor {
    pub expires_at: Timestamp,
    pub id: SubscriptionId,
}

impl From<&Subscription> for ExpiryCursor {
    fn from(subscription: &Subscription) -> Self {
        Self {
            expires_at: subscription.expires_at,
            id: subscription.id,
        }
    }
}

/// Repository port for Subscription aggregate persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Store a new subscription.
    ///
    /// # Errors
    ///
    /// - `ActiveSubscriptionExists` (with a `user_id` detail) if the
    ///   subscription is live and the user already has a live one
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Replace an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if it was never inserted
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its ID.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// The user's ACTIVE or PENDING_RENEWAL subscription, if any.
    async fn find_live_by_user(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;

    /// The user's most recently created subscription in any status.
    async fn find_latest_by_user(&self, user_id: &UserId)
        -> Result<Option<Subscription>, DomainError>;

    /// Live subscriptions ordered by user id, starting after `after`.
    ///
    /// Returns at most `limit` subscriptions; an empty page ends the scan.
    async fn find_live_after(
        &self,
        after: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Subscriptions in `status` with `expires_at` before `before`, ordered
    /// by `(expires_at, id)` and strictly after `after`, at most `limit` of
    /// them.
    async fn find_expiring_before(
        &self,
        status: SubscriptionStatus,
        before: Timestamp,
        after: Option<ExpiryCursor>,
        limit: usize,
    ) -> Result<Vec<Subscription>, DomainError>;
}
