// crates/config/src/resilience_config.rs
//! Resilience configuration sections
//!
//! One section per in-process guard: cache, rate limit, availability,
//! retry, parallel fan-out and batch pacing. Each section builds the runtime
//! component it configures.

use crate::validation::{ConfigSection, Report};
use rampart_resilience::{
    AvailabilityTracker, ParallelExecutor, RateLimiter, RateLimiters, ResilienceResult,
    RetryPolicy, TtlCache,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;

/// TTL cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for entries stored without an explicit one
    pub default_ttl_secs: u64,

    /// TTL for search results
    pub search_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            search_ttl_secs: 1800,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    /// Builds an empty cache using the default TTL
    pub fn build<V: Clone>(&self) -> TtlCache<V> {
        TtlCache::new(self.default_ttl())
    }
}

impl ConfigSection for CacheConfig {
    const NAME: &'static str = "cache";

    fn check(&self, report: &mut Report) {
        report
            .within("default_ttl_secs", self.default_ttl_secs, 1..=MAX_TTL_SECS)
            .within("search_ttl_secs", self.search_ttl_secs, 1..=MAX_TTL_SECS);
    }
}

/// Sliding-window rate limit applied per service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls permitted per window
    pub max_calls: usize,

    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Builds a limiter for a single service
    pub fn limiter(&self, service: &str) -> RateLimiter {
        RateLimiter::new(self.max_calls, self.window()).named(service)
    }

    /// Builds a registry handing out one limiter per service
    pub fn limiters(&self) -> RateLimiters {
        RateLimiters::new(self.max_calls, self.window())
    }
}

impl ConfigSection for RateLimitConfig {
    const NAME: &'static str = "rate_limit";

    fn check(&self, report: &mut Report) {
        report
            .within("max_calls", self.max_calls, 1..=10_000)
            .within("window_secs", self.window_secs, 1..=MAX_WINDOW_SECS);
    }
}

/// Circuit breaker cooldown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// How long a failed service stays unavailable
    pub cooldown_secs: u64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self { cooldown_secs: 300 }
    }
}

impl AvailabilityConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn tracker(&self) -> AvailabilityTracker {
        AvailabilityTracker::new(self.cooldown())
    }
}

impl ConfigSection for AvailabilityConfig {
    const NAME: &'static str = "availability";

    fn check(&self, report: &mut Report) {
        report.within("cooldown_secs", self.cooldown_secs, 1..=MAX_WINDOW_SECS);
    }
}

/// Retry with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,

    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt
    pub backoff_factor: f64,

    /// Randomize each delay by a factor in `[0.5, 1.5]`
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_factor(self.backoff_factor)
            .with_jitter(self.jitter)
    }
}

impl ConfigSection for RetryConfig {
    const NAME: &'static str = "retry";

    fn check(&self, report: &mut Report) {
        report
            .within("max_retries", self.max_retries, 0..=10)
            .within("base_delay_ms", self.base_delay_ms, 1..=60_000)
            .within("max_delay_ms", self.max_delay_ms, 1..=600_000)
            .at_most("base_delay_ms", self.base_delay_ms, "max_delay_ms", self.max_delay_ms)
            .within("backoff_factor", self.backoff_factor, 1.0..=10.0);
    }
}

/// Bounded parallel sub-queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads running sub-queries
    pub workers: usize,

    /// Per-task timeout in milliseconds
    pub task_timeout_ms: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            task_timeout_ms: 5000,
        }
    }
}

impl ParallelConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn executor(&self) -> ResilienceResult<ParallelExecutor> {
        ParallelExecutor::new(self.workers, self.task_timeout())
    }
}

impl ConfigSection for ParallelConfig {
    const NAME: &'static str = "parallel";

    fn check(&self, report: &mut Report) {
        report
            .within("workers", self.workers, 1..=64)
            .within("task_timeout_ms", self.task_timeout_ms, 100..=300_000);
    }
}

/// Pacing for batch searches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Pause between live calls, in milliseconds
    pub delay_ms: u64,

    /// Results requested per query
    pub result_count: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2000,
            result_count: 5,
        }
    }
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl ConfigSection for BatchConfig {
    const NAME: &'static str = "batch";

    fn check(&self, report: &mut Report) {
        report
            .within("delay_ms", self.delay_ms, 0..=60_000)
            .within("result_count", self.result_count, 1..=50);
    }
}
