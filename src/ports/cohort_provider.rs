//! Cohort provider port.
//!
//! Cohort memberships come from the identity layer and are trusted as given.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::catalog::Cohort;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait CohortProvider: Send + Sync {
    /// Cohorts the user belongs to; empty if none.
    async fn cohorts_for(&self, user_id: &UserId) -> Result<BTreeSet<Cohort>, DomainError>;
}
