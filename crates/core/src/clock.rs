//! Injectable time source
//!
//! Components that expire, cool down or back off read time through a
//! [`Clock`] instead of calling `Instant::now()` directly, so tests can drive
//! them with simulated time.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Monotonic time source with a blocking sleep
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    sleeps: Vec<Duration>,
}

/// Simulated clock that only moves when told to
///
/// `sleep` returns immediately, advances the clock by the requested duration
/// and records it, so retry schedules can be asserted without waiting.
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Creates a clock starting at the current instant
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: Instant::now(),
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves the clock forward
    pub fn advance(&self, duration: Duration) {
        self.lock().now += duration;
    }

    /// Returns every duration passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}
