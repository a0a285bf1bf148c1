//! Clock abstraction so anything that reads wall-clock time (lock staleness,
//! rate-limiter windows, session TTL refresh) can be driven by a fixed clock
//! in tests instead of sleeping real time.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now_epoch_secs(&self) -> i64;

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.now_epoch_secs(), 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// A clock pinned to a fixed instant, advanced manually. Used by tests that
/// need to simulate lock staleness or rate-limit window expiry without
/// sleeping.
#[derive(Debug, Clone)]
pub struct FixedClock {
    secs: std::sync::Arc<std::sync::atomic::AtomicI64>,
}

impl FixedClock {
    pub fn new(start_epoch_secs: i64) -> Self {
        Self {
            secs: std::sync::Arc::new(std::sync::atomic::AtomicI64::new(start_epoch_secs)),
        }
    }

    pub fn advance(&self, delta_secs: i64) {
        self.secs.fetch_add(delta_secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.secs.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(1000);
        assert_eq!(clock.now_epoch_secs(), 1000);
        clock.advance(60);
        assert_eq!(clock.now_epoch_secs(), 1060);
    }
}
