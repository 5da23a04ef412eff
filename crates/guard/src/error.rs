// crates/guard/src/error.rs
//! Error types for guarded calls

use rampart_core::{Classification, Classify};
use rampart_fallback::FallbackError;
use rampart_resilience::ResilienceError;
use thiserror::Error;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Failure reported by a [`crate::SearchBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The service refused the call because of its own rate limit
    #[error("Search service throttled: {0}")]
    Throttled(String),

    /// The service could not be reached
    #[error("Search service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something that is not a search response
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

impl Classify for BackendError {
    fn classification(&self) -> Classification {
        match self {
            Self::Unavailable(_) => Classification::Retryable,
            Self::Throttled(_) | Self::Other(_) => Classification::Degraded,
            Self::InvalidResponse(_) => Classification::Fatal,
        }
    }
}

/// Errors that can occur while building or running a guard
#[derive(Debug, Error)]
pub enum GuardError {
    /// Search backend failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Resilience component error
    #[error("Resilience error: {0}")]
    Resilience(#[from] ResilienceError),

    /// Snapshot store error
    #[error("Fallback store error: {0}")]
    Fallback(#[from] FallbackError),

    /// Configuration could not be used
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Classify for GuardError {
    fn classification(&self) -> Classification {
        match self {
            Self::Backend(e) => e.classification(),
            Self::Resilience(e) => e.classification(),
            Self::Fallback(e) => e.classification(),
            Self::Config(_) => Classification::Fatal,
        }
    }
}
