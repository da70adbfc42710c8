//! Clock and scheduler port
//!
//! Time never comes from the system directly; the caller supplies it.

/// A source of the current time
pub trait Clock: Send + Sync {
    /// Current time in seconds
    ///
    /// The origin is arbitrary but must be consistent with the scheduler
    /// the clock backs.
    fn current_time(&self) -> f64;
}

/// A one-shot scheduled callback
pub type ScheduledCallback = Box<dyn FnOnce() + Send>;

/// Schedules one-shot callbacks at absolute times
///
/// Callbacks run on an executor the controller does not own.
pub trait Scheduler: Send + Sync {
    /// Current time in seconds
    fn now(&self) -> f64;

    /// Schedule `callback` to fire once at or after `due` (absolute seconds)
    ///
    /// Returns an opaque, non-zero token.
    fn schedule(&self, callback: ScheduledCallback, due: f64) -> u64;

    /// Cancel a pending schedule
    ///
    /// Idempotent; a no-op if the callback has already run.
    fn cancel(&self, token: u64);
}
