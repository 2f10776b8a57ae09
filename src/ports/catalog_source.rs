//! Catalog source port - backing store for plans and tiers.

use async_trait::async_trait;

use crate::domain::catalog::{Plan, Tier};
use crate::domain::foundation::DomainError;

/// Loads the full plan and tier catalog.
///
/// Called at startup and on every reload; the application builds a new
/// snapshot from the result.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_plans(&self) -> Result<Vec<Plan>, DomainError>;

    async fn load_tiers(&self) -> Result<Vec<Tier>, DomainError>;
}
