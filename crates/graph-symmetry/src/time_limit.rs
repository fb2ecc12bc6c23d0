use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A budget for a long running computation.
///
/// The budget is exhausted when the wall-clock deadline has passed, when the
/// deterministic time advanced by the computation exceeds its limit, or when
/// the shared interrupt flag is set. Every part is optional.
#[derive(Clone, Debug, Default)]
pub struct TimeLimit {
    deadline: Option<Instant>,
    deterministic_limit: Option<f64>,
    deterministic_time: f64,
    interrupt: Option<Arc<AtomicBool>>,
}

impl TimeLimit {
    /// A limit that is never reached.
    pub fn infinite() -> Self {
        Self::default()
    }

    /// A limit that is reached `budget` after now.
    pub fn new(budget: Duration) -> Self {
        Self { deadline: Instant::now().checked_add(budget), ..Self::default() }
    }

    /// Additionally limit the deterministic time, see
    /// [advance_deterministic_time](TimeLimit::advance_deterministic_time).
    pub fn with_deterministic_limit(mut self, limit: f64) -> Self {
        self.deterministic_limit = Some(limit);
        self
    }

    /// Additionally stop as soon as `interrupt` is set, e.g. from another thread.
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Returns `true` once the deadline passed, the deterministic time is
    /// above its limit or the interrupt flag is set.
    pub fn limit_reached(&self) -> bool {
        if self.interrupt.as_ref().is_some_and(|i| i.load(Ordering::Relaxed)) {
            return true;
        }
        if self.deterministic_limit.is_some_and(|limit| self.deterministic_time > limit) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Accounts for work that does not depend on the machine, e.g. a number of
    /// elementary operations scaled to roughly one unit per second.
    pub fn advance_deterministic_time(&mut self, delta: f64) {
        debug_assert!(delta >= 0.0);
        self.deterministic_time += delta;
    }

    /// Returns the deterministic time spent so far.
    pub fn deterministic_time(&self) -> f64 {
        self.deterministic_time
    }
}
