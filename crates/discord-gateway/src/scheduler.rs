//! Tokio-backed scheduler
//!
//! Production implementation of the [`Scheduler`] port. Tests drive the
//! controller with a manual-time scheduler instead.

use crate::ports::{Clock, ScheduledCallback, Scheduler};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock anchored at construction time
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a clock whose time starts at zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// One-shot scheduler running callbacks on the Tokio runtime
///
/// Each schedule spawns a sleeping task; cancellation removes the token
/// before the task fires. Must be used from within a Tokio runtime.
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
    next_token: AtomicU64,
    pending: Arc<DashMap<u64, ()>>,
}

impl TokioScheduler {
    /// Create a scheduler backed by a [`MonotonicClock`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// Create a scheduler backed by the given clock
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_token: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> f64 {
        self.clock.current_time()
    }

    fn schedule(&self, callback: ScheduledCallback, due: f64) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.pending.insert(token, ());

        let delay = (due - self.now()).max(0.0);
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            // Removal arbitrates between firing and cancellation.
            if pending.remove(&token).is_some() {
                callback();
            }
        });

        token
    }

    fn cancel(&self, token: u64) {
        self.pending.remove(&token);
    }
}
