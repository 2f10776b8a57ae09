//! Catalog service.
//!
//! Serves plan and tier reads from an immutable, versioned snapshot. A
//! reload builds a complete new snapshot from the backing source and swaps
//! it in atomically; readers holding the previous `Arc` keep a consistent
//! view until they drop it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::catalog::{CatalogSnapshot, Plan, PlanFilter, Tier, TierFilter};
use crate::domain::foundation::{PlanId, TierId};
use crate::domain::membership::MembershipError;
use crate::ports::CatalogSource;

/// Read side of the plan and tier catalog.
pub struct Catalog {
    source: Arc<dyn CatalogSource>,
    current: RwLock<Arc<CatalogSnapshot>>,
    versions: AtomicU64,
}

impl Catalog {
    /// Loads the first snapshot (version 1).
    pub async fn load(source: Arc<dyn CatalogSource>) -> Result<Self, MembershipError> {
        let snapshot = Self::build(source.as_ref(), 1).await?;
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(snapshot)),
            versions: AtomicU64::new(1),
        })
    }

    /// The snapshot in effect right now.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Rebuilds the snapshot from the source.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// returned. Returns the version now in effect.
    pub async fn reload(&self) -> Result<u64, MembershipError> {
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = match Self::build(self.source.as_ref(), version).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(version, error = %e.detail(), "Catalog reload failed; keeping previous snapshot");
                return Err(e);
            }
        };

        let mut current = self.current.write().await;
        // A slower concurrent reload must not replace a newer snapshot.
        if snapshot.version() > current.version() {
            *current = Arc::new(snapshot);
            tracing::info!(version, "Catalog snapshot reloaded");
        }
        Ok(current.version())
    }

    pub async fn list_plans(&self, filter: &PlanFilter) -> Vec<Plan> {
        self.snapshot().await.list_plans(filter)
    }

    pub async fn list_tiers(&self, filter: &TierFilter) -> Vec<Tier> {
        self.snapshot().await.list_tiers(filter)
    }

    pub async fn get_plan(&self, id: &PlanId) -> Result<Plan, MembershipError> {
        self.snapshot()
            .await
            .plan(id)
            .cloned()
            .ok_or_else(|| MembershipError::PlanNotFound(id.clone()))
    }

    pub async fn get_tier(&self, id: &TierId) -> Result<Tier, MembershipError> {
        self.snapshot()
            .await
            .tier(id)
            .cloned()
            .ok_or_else(|| MembershipError::TierNotFound(id.clone()))
    }

    async fn build(
        source: &dyn CatalogSource,
        version: u64,
    ) -> Result<CatalogSnapshot, MembershipError> {
        let plans = source.load_plans().await?;
        let tiers = source.load_tiers().await?;
        Ok(CatalogSnapshot::new(version, plans, tiers)?)
    }
}
