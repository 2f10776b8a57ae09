//! Clock port.
//!
//! All expiry, renewal-window and evaluation-month computations read time
//! through this port so tests can control it.

use crate::domain::foundation::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
