//! Response envelope marking where data came from

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the data in a [`Response`] was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Fresh result from the underlying dependency
    Live,
    /// Served from the in-memory TTL cache
    Cached,
    /// Substituted from the durable fallback snapshot store
    Fallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Live => write!(f, "live"),
            Origin::Cached => write!(f, "cached"),
            Origin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Structurally valid result returned on every path that has a fallback
///
/// A fallback response may carry no data at all (no snapshot was ever
/// saved); in that case `message` explains why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    /// Origin marker
    pub origin: Origin,

    /// Payload, absent only for fallback responses without a snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Human-readable explanation for degraded responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Text of the failure that forced a fallback, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Response<T> {
    /// Creates a response for freshly fetched data
    pub fn live(data: T) -> Self {
        Self {
            origin: Origin::Live,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Creates a response for data served from the cache
    pub fn cached(data: T) -> Self {
        Self {
            origin: Origin::Cached,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Creates a fallback response
    pub fn fallback(data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            origin: Origin::Fallback,
            data,
            message: Some(message.into()),
            error: None,
        }
    }

    /// Attaches an explanation message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the text of the failure that caused degradation
    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Returns true unless the data is live
    pub fn is_degraded(&self) -> bool {
        self.origin != Origin::Live
    }

    /// Returns true if the data was substituted from a snapshot
    pub fn is_fallback(&self) -> bool {
        self.origin == Origin::Fallback
    }

    /// Returns true if the data came from the cache
    pub fn is_cached(&self) -> bool {
        self.origin == Origin::Cached
    }

    /// Maps the payload, keeping origin and messages
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            origin: self.origin,
            data: self.data.map(f),
            message: self.message,
            error: self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_response() {
        let response = Response::live(42);
        assert_eq!(response.origin, Origin::Live);
        assert_eq!(response.data, Some(42));
        assert!(!response.is_degraded());
    }

    #[test]
    fn test_fallback_without_data() {
        let response: Response<i32> = Response::fallback(None, "search is throttled");
        assert!(response.is_fallback());
        assert!(response.is_degraded());
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("search is throttled"));
    }

    #[test]
    fn test_with_error_and_map() {
        let response = Response::fallback(Some(2), "stale").with_error("connection reset");
        let mapped = response.map(|v| v * 10);
        assert_eq!(mapped.data, Some(20));
        assert_eq!(mapped.error.as_deref(), Some("connection reset"));
        assert_eq!(mapped.origin, Origin::Fallback);
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        let json = serde_json::to_string(&Response::cached("hit")).expect("serialize");
        assert!(json.contains("\"origin\":\"cached\""));
        assert!(!json.contains("\"error\""));
    }
}
