//! Catalog domain module.
//!
//! Plans (billing duration and price) and tiers (benefit levels earned by
//! activity), plus the versioned snapshot every read is served from.

mod cohort;
mod filter;
mod plan;
mod snapshot;
mod tier;

pub use cohort::Cohort;
pub use filter::{PlanFilter, TierFilter};
pub use plan::{Plan, PlanDefinition, PlanType};
pub use snapshot::{rank_tiers, CatalogSnapshot, TierLadder};
pub use tier::{Tier, TierBenefits, TierDefinition, TierLevel};
