//! Clocks - the only source of `now` inside the kernel

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Supplies every `created_at`/`timestamp` the kernel writes
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for scripted flows and tests
///
/// Clones share the same instant, so a handle kept by the test advances
/// the clock the runtime reads.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self
            .now
            .write()
            .unwrap_or_else(PoisonError::into_inner) = instant;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::minutes(minutes);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shares_instant_across_clones() {
        let clock = ManualClock::new("2025-06-02T10:00:00Z".parse().unwrap());
        let handle = clock.clone();

        handle.advance_minutes(30);
        assert_eq!(clock.now(), "2025-06-02T10:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }
}
