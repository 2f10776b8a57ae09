//! Activity store port.
//!
//! Persists per-user activity aggregates. Writes are increments applied
//! atomically by the store, so activity recording never needs the
//! subscription lock.

use async_trait::async_trait;

use crate::domain::activity::{Activity, ActivityAggregate};
use crate::domain::foundation::{DomainError, Timestamp, UserId, YearMonth};

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Atomically adds `activity` to its user's aggregate, creating the
    /// aggregate on first use and dropping buckets before `retain_from`.
    async fn record(
        &self,
        activity: &Activity,
        retain_from: YearMonth,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Applies every activity or none of them.
    async fn record_all(
        &self,
        activities: &[Activity],
        retain_from: YearMonth,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// The user's aggregate, or `None` before their first activity.
    async fn get(&self, user_id: &UserId) -> Result<Option<ActivityAggregate>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn ActivityStore) {}
    }
}
