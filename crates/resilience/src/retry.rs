// crates/resilience/src/retry.rs
//! Retry policies with exponential backoff

use rampart_core::{Classify, Clock, SystemClock};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base_delay * backoff_factor^attempt`
    Exponential,
    /// `base_delay * (attempt + 1)`
    Linear,
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: usize,
    /// Delay before the first retry
    base_delay: Duration,
    /// Upper bound for any single delay
    max_delay: Duration,
    /// Growth factor for exponential backoff
    backoff_factor: f64,
    /// Whether to scale delays by a random factor in [0.5, 1.5]
    use_jitter: bool,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Creates an exponential policy with `max_retries` retries
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            use_jitter: true,
            backoff: Backoff::Exponential,
        }
    }

    /// Creates a linear policy waiting `step * (attempt + 1)` between attempts
    pub fn linear(max_retries: usize, step: Duration) -> Self {
        Self {
            max_retries,
            base_delay: step,
            max_delay: Duration::MAX,
            backoff_factor: 1.0,
            use_jitter: false,
            backoff: Backoff::Linear,
        }
    }

    /// Sets the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff factor
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets whether to use jitter
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Returns the number of retries after the first attempt
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Returns the total number of invocations, `max_retries + 1`
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Returns the maximum delay
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the backoff shape
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Calculates the delay after failed attempt `attempt` (0-based), without jitter
    pub fn base_delay_for_attempt(&self, attempt: usize) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let raw = match self.backoff {
            Backoff::Exponential => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                base * self.backoff_factor.powi(exponent)
            }
            Backoff::Linear => base * (attempt as f64 + 1.0),
        };

        self.clamp(raw)
    }

    /// Calculates the delay after failed attempt `attempt`, applying jitter if enabled
    ///
    /// Jittered delays are still capped at the maximum delay.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let delay = self.base_delay_for_attempt(attempt);
        if !self.use_jitter {
            return delay;
        }

        let factor = rand::thread_rng().gen_range(0.5..=1.5);
        self.clamp(delay.as_secs_f64() * factor)
    }

    fn clamp(&self, secs: f64) -> Duration {
        if !secs.is_finite() || secs < 0.0 {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(secs)
            .map(|d| d.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Runs operations under a [`RetryPolicy`]
///
/// The runner itself does not decide what is retryable: [`Retry::run`]
/// retries every failure, [`Retry::run_if`] asks a predicate, and
/// [`Retry::run_classified`] defers to the error's [`Classify`] impl. When
/// attempts run out, or a failure is not retryable, the last error is
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct Retry {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Retry {
    /// Creates a runner that sleeps on the system clock
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `clock` for sleeping between attempts
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries every failure
    pub fn run<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: fmt::Display,
    {
        self.run_if(operation, |_| true)
    }

    /// Retries failures the error's classification marks retryable
    pub fn run_classified<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: fmt::Display + Classify,
    {
        self.run_if(operation, |e: &E| e.is_retryable())
    }

    /// Retries failures for which `should_retry` returns true
    pub fn run_if<F, P, T, E>(&self, mut operation: F, mut should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: FnMut(&E) -> bool,
        E: fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt >= self.policy.max_retries || !should_retry(&e) {
                        return Err(e);
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    log::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.policy.max_attempts(),
                        e,
                        delay
                    );
                    self.clock.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// Executes an operation with retry logic, retrying every failure
pub fn with_retry<F, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
{
    Retry::new(policy.clone()).run(operation)
}

/// Executes an operation with retry logic, retrying only when `should_retry` agrees
pub fn with_retry_if<F, P, T, E>(policy: &RetryPolicy, operation: F, should_retry: P) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: FnMut(&E) -> bool,
    E: fmt::Display,
{
    Retry::new(policy.clone()).run_if(operation, should_retry)
}
