//! In-memory activity store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::activity::{Activity, ActivityAggregate};
use crate::domain::foundation::{DomainError, Timestamp, UserId, YearMonth};
use crate::ports::ActivityStore;

/// Activity aggregates held in process memory.
///
/// Each write applies its increments under the map's write lock, so
/// concurrent recordings for the same user never lose updates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityStore {
    aggregates: Arc<RwLock<HashMap<UserId, ActivityAggregate>>>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn record(
        &self,
        activity: &Activity,
        retain_from: YearMonth,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut aggregates = self.aggregates.write().await;
        aggregates
            .entry(activity.user_id.clone())
            .or_insert_with(|| ActivityAggregate::new(activity.user_id.clone(), now))
            .apply(activity, retain_from, now);
        Ok(())
    }

    async fn record_all(
        &self,
        activities: &[Activity],
        retain_from: YearMonth,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let mut aggregates = self.aggregates.write().await;
        for activity in activities {
            aggregates
                .entry(activity.user_id.clone())
                .or_insert_with(|| ActivityAggregate::new(activity.user_id.clone(), now))
                .apply(activity, retain_from, now);
        }
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<ActivityAggregate>, DomainError> {
        Ok(self.aggregates.read().await.get(user_id).cloned())
    }
}
