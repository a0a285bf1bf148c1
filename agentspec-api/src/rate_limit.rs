//! Per-IP auth-failure rate limiting (§4.8). Deliberately separate from any
//! general request-volume limiter: this structure only ever reacts to failed
//! authentication attempts, never to request volume on its own. Grounded on
//! the teacher's `RateLimitState` (`middleware/mod.rs`) for the
//! counter-plus-window shape, rebuilt on `dashmap::DashMap` instead of a
//! `governor` quota since the window here resets on success and a block
//! outlives the window, neither of which `governor`'s token bucket models.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Tracking state for a single source IP.
struct Entry {
    /// Failures observed inside the current window.
    failures: u32,
    /// Start of the current failure-counting window.
    window_start: Instant,
    /// Set when `failures` has crossed the threshold; cleared once
    /// `blocked_until` has passed.
    blocked_until: Option<Instant>,
    /// Last time this entry was touched, for eviction.
    last_seen: Instant,
}

impl Entry {
    fn fresh(now: Instant) -> Self {
        Self { failures: 0, window_start: now, blocked_until: None, last_seen: now }
    }
}

/// Tracks failed-auth counts per source IP and blocks IPs that cross the
/// threshold, independent of whether the key they eventually present is
/// correct.
pub struct AuthFailureLimiter {
    entries: DashMap<String, Entry>,
    threshold: u32,
    window: Duration,
    block_duration: Duration,
    /// Entries untouched longer than this are dropped on the next sweep.
    eviction_after: Duration,
}

impl AuthFailureLimiter {
    pub fn new(threshold: u32, window: Duration, block_duration: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            threshold,
            window,
            block_duration,
            eviction_after: block_duration * 4,
        }
    }

    /// Returns the remaining block duration in seconds if `ip` is currently
    /// blocked, independent of whether it is about to present a valid key.
    pub fn check(&self, ip: &str, now: Instant) -> Option<u64> {
        let entry = self.entries.get(ip)?;
        let blocked_until = entry.blocked_until?;
        if now < blocked_until {
            Some((blocked_until - now).as_secs().max(1))
        } else {
            None
        }
    }

    /// Records a failed authentication attempt from `ip`. Returns the block
    /// duration in seconds if this attempt crossed the threshold and newly
    /// triggered a block.
    pub fn record_failure(&self, ip: &str, now: Instant) -> Option<u64> {
        let mut entry = self.entries.entry(ip.to_string()).or_insert_with(|| Entry::fresh(now));
        entry.last_seen = now;

        if now.duration_since(entry.window_start) > self.window {
            entry.window_start = now;
            entry.failures = 0;
        }

        entry.failures += 1;

        if entry.failures >= self.threshold {
            let already_blocked = entry.blocked_until.is_some_and(|until| now < until);
            entry.blocked_until = Some(now + self.block_duration);
            if already_blocked {
                None
            } else {
                Some(self.block_duration.as_secs())
            }
        } else {
            None
        }
    }

    /// Resets the failure counter on a successful authentication. Does not
    /// clear an already-active block — a correct key presented mid-block
    /// does not shorten the block, per §4.8.
    pub fn record_success(&self, ip: &str, now: Instant) {
        if let Some(mut entry) = self.entries.get_mut(ip) {
            entry.failures = 0;
            entry.window_start = now;
            entry.last_seen = now;
        }
    }

    /// Drops entries that have seen no activity in a long while, so long-
    /// running servers don't accumulate one entry per IP ever seen.
    pub fn evict_stale(&self, now: Instant) {
        self.entries.retain(|_, entry| now.duration_since(entry.last_seen) < self.eviction_after);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_unblocked_below_threshold() {
        let limiter = AuthFailureLimiter::new(10, Duration::from_secs(60), Duration::from_secs(300));
        let now = Instant::now();
        for _ in 0..9 {
            assert!(limiter.record_failure("1.2.3.4", now).is_none());
        }
        assert!(limiter.check("1.2.3.4", now).is_none());
    }

    #[test]
    fn blocks_on_crossing_threshold() {
        let limiter = AuthFailureLimiter::new(10, Duration::from_secs(60), Duration::from_secs(300));
        let now = Instant::now();
        for _ in 0..10 {
            limiter.record_failure("1.2.3.4", now);
        }
        let remaining = limiter.check("1.2.3.4", now).expect("should be blocked");
        assert!(remaining > 0 && remaining <= 300);
    }

    #[test]
    fn success_resets_counter_but_not_an_active_block() {
        let limiter = AuthFailureLimiter::new(10, Duration::from_secs(60), Duration::from_secs(300));
        let now = Instant::now();
        for _ in 0..10 {
            limiter.record_failure("1.2.3.4", now);
        }
        assert!(limiter.check("1.2.3.4", now).is_some());
        limiter.record_success("1.2.3.4", now);
        assert!(limiter.check("1.2.3.4", now).is_some(), "an active block must survive a correct key");
    }

    #[test]
    fn window_expiry_resets_the_failure_count() {
        let limiter = AuthFailureLimiter::new(10, Duration::from_secs(60), Duration::from_secs(300));
        let now = Instant::now();
        for _ in 0..9 {
            limiter.record_failure("1.2.3.4", now);
        }
        let later = now + Duration::from_secs(61);
        for _ in 0..9 {
            assert!(limiter.record_failure("1.2.3.4", later).is_none());
        }
    }

    #[test]
    fn stale_entries_are_evicted() {
        let limiter = AuthFailureLimiter::new(10, Duration::from_secs(60), Duration::from_secs(300));
        let now = Instant::now();
        limiter.record_failure("1.2.3.4", now);
        assert_eq!(limiter.len(), 1);
        limiter.evict_stale(now + Duration::from_secs(3000));
        assert_eq!(limiter.len(), 0);
    }
}
