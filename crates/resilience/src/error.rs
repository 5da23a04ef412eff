// crates/resilience/src/error.rs
//! Error types for resilience operations

use rampart_core::{Classification, Classify};
use std::time::Duration;
use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur in resilience operations
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Rate limit exceeded
    #[error("Rate limit exceeded for '{service}' (limit: {limit} per {window:?}), retry in {wait:?}")]
    RateLimitExceeded {
        service: String,
        limit: usize,
        window: Duration,
        wait: Duration,
    },

    /// Service is marked unavailable by the availability tracker
    #[error("Service '{service}' is unavailable for another {remaining:?}")]
    ServiceUnavailable { service: String, remaining: Duration },

    /// A parallel sub-task exceeded its timeout
    #[error("Task '{task}' timed out after {timeout:?}")]
    TaskTimeout { task: String, timeout: Duration },

    /// The parallel executor was invoked from inside an async runtime
    #[error("Parallel executor cannot block inside an async runtime")]
    BlockingInAsyncContext,

    /// Worker pool could not be started
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[source] std::io::Error),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl Classify for ResilienceError {
    fn classification(&self) -> Classification {
        match self {
            Self::RateLimitExceeded { .. } => Classification::Retryable,
            Self::ServiceUnavailable { .. } | Self::TaskTimeout { .. } => Classification::Degraded,
            Self::BlockingInAsyncContext | Self::WorkerPool(_) | Self::Custom(_) => {
                Classification::Fatal
            }
        }
    }
}
