//! Membership Engine - subscription lifecycle and tier evaluation
//!
//! Manages paid memberships along two axes: a billing plan and a benefit
//! tier earned through activity. The engine owns the subscription state
//! machine, rolling activity aggregates, and the evaluator that promotes or
//! demotes users, with per-user serialization of every read-modify-write.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
