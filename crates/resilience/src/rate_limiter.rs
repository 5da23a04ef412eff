// crates/resilience/src/rate_limiter.rs
//! Sliding-window rate limiting

use crate::error::{ResilienceError, ResilienceResult};
use rampart_core::{Clock, SystemClock};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Sliding-window rate limiter for a single service
///
/// Keeps the timestamps of recorded calls and trims those older than the
/// window on every check. Checking never records: after acting on a `true`
/// from [`RateLimiter::can_make_call`] the caller must call
/// [`RateLimiter::record_call`]. [`RateLimiter::try_acquire`] does both under
/// one lock.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    service: String,
    max_calls: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    calls: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Creates a new rate limiter
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self::with_clock(max_calls, window, Arc::new(SystemClock))
    }

    /// Creates a rate limiter reading time from `clock`
    pub fn with_clock(max_calls: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            service: "default".to_string(),
            max_calls,
            window,
            clock,
            calls: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Names the service this limiter guards, used in errors and logs
    pub fn named(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Returns true if another call fits in the current window
    pub fn can_make_call(&self) -> bool {
        let now = self.clock.now();
        let mut calls = self.lock();
        self.trim(&mut calls, now);
        calls.len() < self.max_calls
    }

    /// Records a call made now
    pub fn record_call(&self) {
        let now = self.clock.now();
        let mut calls = self.lock();
        self.trim(&mut calls, now);
        calls.push_back(now);
    }

    /// Returns how long until a call is permitted, zero if one is now
    pub fn wait_time(&self) -> Duration {
        let now = self.clock.now();
        let mut calls = self.lock();
        self.wait_time_locked(&mut calls, now)
    }

    /// Checks capacity and records the call atomically
    pub fn try_acquire(&self) -> ResilienceResult<()> {
        let now = self.clock.now();
        let mut calls = self.lock();
        let wait = self.wait_time_locked(&mut calls, now);

        if wait.is_zero() {
            calls.push_back(now);
            Ok(())
        } else {
            Err(ResilienceError::RateLimitExceeded {
                service: self.service.clone(),
                limit: self.max_calls,
                window: self.window,
                wait,
            })
        }
    }

    /// Blocks until a call is permitted, then records it
    ///
    /// Returns the total time spent waiting. A limiter with zero capacity
    /// fails immediately instead of waiting forever.
    pub fn acquire_blocking(&self) -> ResilienceResult<Duration> {
        let mut waited = Duration::ZERO;
        loop {
            match self.try_acquire() {
                Ok(()) => return Ok(waited),
                Err(ResilienceError::RateLimitExceeded { wait, .. }) if self.max_calls > 0 => {
                    log::debug!(
                        "Rate limit reached for '{}', waiting {:?}",
                        self.service,
                        wait
                    );
                    self.clock.sleep(wait);
                    waited += wait;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Gets the service name
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Gets the maximum number of calls per window
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Gets the window length
    pub fn window(&self) -> Duration {
        self.window
    }

    fn wait_time_locked(&self, calls: &mut VecDeque<Instant>, now: Instant) -> Duration {
        self.trim(calls, now);
        if calls.len() < self.max_calls {
            return Duration::ZERO;
        }
        match calls.front() {
            Some(&oldest) => self
                .window
                .saturating_sub(now.saturating_duration_since(oldest)),
            // max_calls == 0: no call is ever permitted
            None => self.window,
        }
    }

    fn trim(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = calls.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-service rate limiters sharing one configuration
#[derive(Debug)]
pub struct RateLimiters {
    max_calls: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    limiters: Mutex<HashMap<String, RateLimiter>>,
}

impl RateLimiters {
    /// Creates a registry using the system clock
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self::with_clock(max_calls, window, Arc::new(SystemClock))
    }

    /// Creates a registry reading time from `clock`
    pub fn with_clock(max_calls: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_calls,
            window,
            clock,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the limiter for `service`, creating it on first use
    ///
    /// The returned handle shares its call window with every other handle
    /// for the same service.
    pub fn for_service(&self, service: &str) -> RateLimiter {
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        limiters
            .entry(service.to_string())
            .or_insert_with(|| {
                RateLimiter::with_clock(self.max_calls, self.window, Arc::clone(&self.clock))
                    .named(service)
            })
            .clone()
    }
}
