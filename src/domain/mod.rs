//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `catalog` - Plans, tiers and the versioned catalog snapshot
//! - `activity` - Activity events and per-user rolling aggregates
//! - `membership` - Subscription lifecycle and tier evaluation

pub mod activity;
pub mod catalog;
pub mod foundation;
pub mod membership;
