//! Application layer - Commands, Queries, Handlers and periodic jobs.
//!
//! Orchestrates the domain through the ports. Write paths hold the user's
//! lock for the whole read-modify-write; reads go straight to the ports.

mod catalog;
mod context;
pub mod handlers;
mod policy;
pub mod scheduler;
mod service;
mod user_locks;

pub use catalog::Catalog;
pub use context::{EligibilityInputs, HandlerContext};
pub use policy::MembershipPolicy;
pub use scheduler::{
    ExpirySweep, ExpirySweepReport, MembershipScheduler, SchedulerSettings, SweepReport,
    TierEvaluationSweep,
};
pub use service::MembershipService;
pub use user_locks::{UserLockGuard, UserLocks};
