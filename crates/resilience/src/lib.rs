// crates/resilience/src/lib.rs
//! Resilience patterns for calls to unreliable dependencies
//!
//! This crate provides:
//! - A TTL cache with lazy eviction and deterministic cache keys
//! - Sliding-window rate limiting, per service
//! - Service availability tracking with cooldown (a lazy circuit breaker)
//! - Retry with exponential backoff and jitter
//! - Bounded parallel execution with per-task timeouts
//!
//! All state is in-memory and process-local. Build each component once at
//! startup and share it by reference or `Arc`.
//!
//! # Example
//!
//! ```rust
//! use rampart_resilience::{AvailabilityTracker, CacheKey, RateLimiter, RetryPolicy, TtlCache};
//! use std::time::Duration;
//!
//! let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(1800));
//! let key = CacheKey::new("web_search").param("query", "tea").param("count", 10);
//! assert!(cache.get(&key.build()).is_none());
//!
//! let limiter = RateLimiter::new(10, Duration::from_secs(60));
//! assert!(limiter.can_make_call());
//!
//! let tracker = AvailabilityTracker::new(Duration::from_secs(300));
//! assert!(tracker.is_available("search"));
//!
//! let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(100));
//! assert_eq!(policy.max_attempts(), 4);
//! ```

mod availability;
mod cache;
mod error;
mod parallel;
mod rate_limiter;
mod retry;

pub use availability::{AvailabilityState, AvailabilityTracker, ServiceStatus, DEFAULT_COOLDOWN};
pub use cache::{CacheEntry, CacheKey, CacheStats, TtlCache, DEFAULT_TTL};
pub use error::{ResilienceError, ResilienceResult};
pub use parallel::{
    CancelSignal, ParallelExecutor, ParallelResults, ParallelTask, TaskError, TaskOutcome,
    TaskReport,
};
pub use rate_limiter::{RateLimiter, RateLimiters};
pub use retry::{with_retry, with_retry_if, Backoff, Retry, RetryPolicy};
