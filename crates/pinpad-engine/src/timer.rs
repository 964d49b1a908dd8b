//! One-shot logical timers, polled from the engine tick.
//!
//! Nothing here spawns threads or arms OS timers: a deadline is just a
//! monotonic timestamp compared against the clock on every tick.

use std::time::Duration;

/// Pending one-shot timers keyed by `K`. At most one timer per key.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    pending: Vec<(K, Duration)>,
}

impl<K: Copy + Eq> TimerQueue<K> {
    /// Empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Arm `key` to fire at `deadline`, replacing any pending deadline for
    /// the same key.
    pub fn schedule(&mut self, key: K, deadline: Duration) {
        self.pending.retain(|(k, _)| *k != key);
        self.pending.push((key, deadline));
    }

    /// Whether `key` is armed.
    #[must_use]
    pub fn is_pending(&self, key: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == key)
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Duration) -> Vec<K> {
        let mut due: Vec<(K, Duration)> = Vec::new();
        self.pending.retain(|&(k, deadline)| {
            if deadline <= now {
                due.push((k, deadline));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(_, deadline)| deadline);
        due.into_iter().map(|(k, _)| k).collect()
    }

    /// Whether nothing is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Copy + Eq> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
