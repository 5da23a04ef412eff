//! Failure classification shared by every Rampart error type
//!
//! Each crate keeps its own `thiserror` enum; this module only provides the
//! three-way split that retry and fallback decisions are made on.

use std::fmt;

/// How a failure should be handled by the resilience layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    /// Transient failure, safe to retry with backoff
    Retryable,
    /// Dependency is unavailable; substitute fallback data instead of failing
    Degraded,
    /// Non-retryable failure, propagate to the caller unchanged
    Fatal,
}

impl Classification {
    /// Returns true if the operation may be attempted again
    pub fn is_retryable(self) -> bool {
        self == Self::Retryable
    }

    /// Returns true if the caller should serve fallback data
    pub fn is_degraded(self) -> bool {
        self == Self::Degraded
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retryable => write!(f, "retryable"),
            Self::Degraded => write!(f, "degraded"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Implemented by error types that know how they should be handled
pub trait Classify {
    /// Returns the classification of this failure
    fn classification(&self) -> Classification;

    /// Returns true if this failure can be retried
    fn is_retryable(&self) -> bool {
        self.classification().is_retryable()
    }
}
