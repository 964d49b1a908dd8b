//! Time sources for the engine.
//!
//! Two readings are needed and they must not be confused:
//! - a monotonic reading for hold and grace timers
//! - wall-clock Unix seconds for TOTP

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Injected time source.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin. Never goes backwards.
    fn monotonic(&self) -> Duration;

    /// Seconds since the Unix epoch, from the wall clock.
    fn unix_time(&self) -> u64;
}

/// Real clock backed by [`Instant`] and [`SystemTime`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose monotonic origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn unix_time(&self) -> u64 {
        // A clock set before 1970 yields 0 and TOTP codes will not match.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}

/// Hand-driven clock. Clones share the same readings, so a test can keep
/// one handle and advance time after moving the other into a session.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    monotonic_ms: Arc<AtomicU64>,
    unix_secs: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at monotonic zero and the given Unix time.
    #[must_use]
    pub fn at_unix(unix_secs: u64) -> Self {
        let clock = Self::default();
        clock.unix_secs.store(unix_secs, Ordering::SeqCst);
        clock
    }

    /// Move both readings forward by `by` (millisecond resolution).
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let prev = self.monotonic_ms.fetch_add(ms, Ordering::SeqCst);
        let prev_total = prev.saturating_add(ms);
        let prev_secs = prev / 1_000;
        let new_secs = prev_total / 1_000;
        self.unix_secs
            .fetch_add(new_secs.saturating_sub(prev_secs), Ordering::SeqCst);
    }

    /// Jump the wall clock without touching the monotonic reading.
    pub fn set_unix_time(&self, unix_secs: u64) {
        self.unix_secs.store(unix_secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_millis(self.monotonic_ms.load(Ordering::SeqCst))
    }

    fn unix_time(&self) -> u64 {
        self.unix_secs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at_unix(1_000);
        let handle = clock.clone();
        handle.advance(Duration::from_millis(2_500));
        assert_eq!(clock.monotonic(), Duration::from_millis(2_500));
        assert_eq!(clock.unix_time(), 1_002);
    }

    #[test]
    fn wall_clock_jump_leaves_monotonic_alone() {
        let clock = ManualClock::at_unix(0);
        clock.set_unix_time(1_234_567_890);
        assert_eq!(clock.unix_time(), 1_234_567_890);
        assert_eq!(clock.monotonic(), Duration::ZERO);
    }

    #[test]
    fn system_clock_is_past_2020() {
        let clock = SystemClock::new();
        assert!(clock.unix_time() > 1_577_836_800);
        assert!(clock.monotonic() < Duration::from_secs(60));
    }
}
