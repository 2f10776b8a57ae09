//! In-memory cohort provider.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::catalog::Cohort;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::CohortProvider;

/// Cohort memberships assigned in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCohortProvider {
    cohorts: Arc<RwLock<HashMap<UserId, BTreeSet<Cohort>>>>,
}

impl InMemoryCohortProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user's cohort set.
    pub async fn assign(&self, user_id: UserId, cohorts: impl IntoIterator<Item = Cohort>) {
        self.cohorts
            .write()
            .await
            .insert(user_id, cohorts.into_iter().collect());
    }
}

#[async_trait]
impl CohortProvider for InMemoryCohortProvider {
    async fn cohorts_for(&self, user_id: &UserId) -> Result<BTreeSet<Cohort>, DomainError> {
        Ok(self
            .cohorts
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_has_no_cohorts() {
        let provider = InMemoryCohortProvider::new();
        let cohorts = provider
            .cohorts_for(&UserId::new("nobody").unwrap())
            .await
            .unwrap();
        assert!(cohorts.is_empty());
    }

    #[tokio::test]
    async fn assign_replaces_cohorts() {
        let provider = InMemoryCohortProvider::new();
        let user = UserId::new("user-1").unwrap();
        provider
            .assign(user.clone(), [Cohort::new("vip").unwrap()])
            .await;
        provider
            .assign(user.clone(), [Cohort::new("enterprise").unwrap()])
            .await;

        let cohorts = provider.cohorts_for(&user).await.unwrap();
        assert_eq!(cohorts.len(), 1);
        assert!(cohorts.contains(&Cohort::new("ENTERPRISE").unwrap()));
    }
}
