//! Versioned, immutable view of the plan and tier catalog.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::foundation::{PlanId, TierId, ValidationError};

use super::{Plan, PlanFilter, Tier, TierFilter};

/// Immutable catalog contents at a given version.
///
/// Readers hold an `Arc<CatalogSnapshot>`; reloading builds a new snapshot
/// rather than mutating this one.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    version: u64,
    plans: BTreeMap<PlanId, Plan>,
    tiers: BTreeMap<TierId, Tier>,
    ladder: TierLadder,
}

impl CatalogSnapshot {
    /// Builds a snapshot, rejecting duplicate ids and catalogs without an
    /// active tier.
    pub fn new(version: u64, plans: Vec<Plan>, tiers: Vec<Tier>) -> Result<Self, ValidationError> {
        let mut plan_map = BTreeMap::new();
        for plan in plans {
            let id = plan.id().clone();
            if plan_map.insert(id.clone(), plan).is_some() {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("duplicate plan id '{}'", id),
                ));
            }
        }

        let mut tier_map = BTreeMap::new();
        for tier in tiers {
            let id = tier.id().clone();
            if tier_map.insert(id.clone(), tier).is_some() {
                return Err(ValidationError::invalid_format(
                    "tiers",
                    format!("duplicate tier id '{}'", id),
                ));
            }
        }

        let ladder = TierLadder::new(tier_map.values().cloned().collect())?;

        Ok(Self {
            version,
            plans: plan_map,
            tiers: tier_map,
            ladder,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn plan(&self, id: &PlanId) -> Option<&Plan> {
        self.plans.get(id)
    }

    pub fn tier(&self, id: &TierId) -> Option<&Tier> {
        self.tiers.get(id)
    }

    /// Plans matching `filter`, ordered by id.
    pub fn list_plans(&self, filter: &PlanFilter) -> Vec<Plan> {
        self.plans
            .values()
            .filter(|plan| filter.matches(plan))
            .cloned()
            .collect()
    }

    /// Tiers matching `filter`, ordered by level then id.
    pub fn list_tiers(&self, filter: &TierFilter) -> Vec<Tier> {
        let mut tiers: Vec<Tier> = self
            .tiers
            .values()
            .filter(|tier| filter.matches(tier))
            .cloned()
            .collect();
        tiers.sort_by(|a, b| a.level().cmp(&b.level()).then_with(|| a.id().cmp(b.id())));
        tiers
    }

    /// Active tiers, the evaluator's candidate set.
    pub fn ladder(&self) -> &TierLadder {
        &self.ladder
    }
}

/// Non-empty set of active tiers, ordered from lowest to highest rank.
#[derive(Debug, Clone)]
pub struct TierLadder {
    tiers: Vec<Tier>,
}

impl TierLadder {
    /// Keeps the active tiers of `tiers`; fails if none is active.
    pub fn new(tiers: Vec<Tier>) -> Result<Self, ValidationError> {
        let mut tiers: Vec<Tier> = tiers.into_iter().filter(Tier::is_active).collect();
        if tiers.is_empty() {
            return Err(ValidationError::invalid_format(
                "tiers",
                "catalog must contain at least one active tier",
            ));
        }
        tiers.sort_by(rank_tiers);
        Ok(Self { tiers })
    }

    /// Tiers from lowest to highest rank.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// The lowest-ordinal active tier, assigned when nothing else is eligible.
    pub fn baseline(&self) -> &Tier {
        // Among tiers sharing the lowest level, prefer the best ranked one.
        let lowest = self.tiers[0].level();
        self.tiers
            .iter()
            .filter(|tier| tier.level() == lowest)
            .max_by(|a, b| rank_tiers(a, b))
            .unwrap_or(&self.tiers[0])
    }

    pub fn get(&self, id: &TierId) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.id() == id)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Total order over tiers: level, then discount, then reversed id so the
/// lowest id ranks highest among otherwise equal tiers.
pub fn rank_tiers(a: &Tier, b: &Tier) -> Ordering {
    a.level()
        .cmp(&b.level())
        .then_with(|| a.discount_percent().cmp(&b.discount_percent()))
        .then_with(|| b.id().cmp(a.id()))
}
