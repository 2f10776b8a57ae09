//! Clock adapters.

use chrono::Duration;
use std::sync::{PoisonError, RwLock};

use crate::domain::foundation::Timestamp;
use crate::ports::Clock;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now = Timestamp::from_datetime(*now.as_datetime() + by);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_stands_still_until_advanced() {
        let start = Timestamp::from_unix_secs(1_700_000_000);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance_days(2);
        assert_eq!(clock.now(), start.add_days(2));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        assert!(!now.is_before(&before));
    }
}
