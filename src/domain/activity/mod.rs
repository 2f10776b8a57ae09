//! Activity domain module.
//!
//! Activity events (orders, returns, reviews, referrals) and the per-user
//! month-bucketed aggregate that tier evaluation reads.

mod event;
mod aggregate;

pub use event::{Activity, ActivityPolicy, ActivityRejection, ActivityType};
pub use aggregate::{ActivityAggregate, EligibilityMetrics, MonthBucket};
