// crates/database/src/executor.rs
//! Retrying unit-of-work executor
//!
//! Each attempt acquires a fresh session, runs the caller's work against it,
//! and closes it before returning, whatever the outcome. Connection-class
//! failures are retried with a linearly growing delay; any other failure is
//! returned immediately.
//!
//! Work is re-run from scratch on retry, so it must be safe to execute more
//! than once.

use crate::error::DbResult;
use crate::session::{Session, SessionSource};
use rampart_core::{Classify, Clock, SystemClock};
use rampart_resilience::{Retry, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default delay unit between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Runs units of work against sessions from a [`SessionSource`]
#[derive(Debug)]
pub struct UnitOfWork<S> {
    source: S,
    max_retries: usize,
    retry_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: SessionSource> UnitOfWork<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the retry bounds used by [`UnitOfWork::run`]
    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Uses `clock` for sleeping between attempts
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs `work` with the configured retry bounds
    pub fn run<T, F>(&self, work: F) -> DbResult<T>
    where
        F: FnMut(&mut S::Session) -> DbResult<T>,
    {
        self.execute(work, self.max_retries, self.retry_delay)
    }

    /// Runs `work`, retrying connection failures up to `max_retries` times
    ///
    /// Waits `retry_delay * (attempt + 1)` before each retry.
    pub fn execute<T, F>(&self, mut work: F, max_retries: usize, retry_delay: Duration) -> DbResult<T>
    where
        F: FnMut(&mut S::Session) -> DbResult<T>,
    {
        let retry = Retry::new(RetryPolicy::linear(max_retries, retry_delay))
            .with_clock(Arc::clone(&self.clock));

        let mut attempts = 0;
        let result = retry.run_classified(|| {
            attempts += 1;
            self.attempt(&mut work)
        });

        match &result {
            Err(e) if e.is_retryable() => {
                log::error!("Database operation failed after {} attempts: {}", attempts, e);
            }
            Err(e) => log::error!("Database operation failed: {}", e),
            Ok(_) if attempts > 1 => {
                log::info!("Database operation succeeded on attempt {}", attempts);
            }
            Ok(_) => {}
        }

        result
    }

    fn attempt<T, F>(&self, work: &mut F) -> DbResult<T>
    where
        F: FnMut(&mut S::Session) -> DbResult<T>,
    {
        let mut session = self.source.acquire()?;
        let result = work(&mut session);
        if let Err(e) = session.close() {
            log::warn!("Failed to close database session: {}", e);
        }
        result
    }
}

/// Runs `work` once per attempt against a fresh session from `source`
pub fn execute_with_retry<S, T, F>(
    source: &S,
    work: F,
    max_retries: usize,
    retry_delay: Duration,
) -> DbResult<T>
where
    S: SessionSource,
    F: FnMut(&mut S::Session) -> DbResult<T>,
{
    UnitOfWork::new(source).execute(work, max_retries, retry_delay)
}

impl<S> UnitOfWork<S> {
    /// Consumes the executor, returning its session source
    pub fn into_source(self) -> S {
        self.source
    }
}
