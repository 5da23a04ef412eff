// crates/database/src/error.rs
//! Database error classification
//!
//! Only connection-class failures are worth retrying: the work is re-run on a
//! fresh session and may succeed. Everything else is returned to the caller
//! unchanged on the first occurrence.

use rampart_core::{Classification, Classify};
use std::error::Error as StdError;
use thiserror::Error;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Phrases in an operational error message that mean the connection is gone
pub const TRANSIENT_PHRASES: &[&str] = &[
    "terminating connection",
    "server closed the connection",
    "connection already closed",
    "could not connect",
    "connection refused",
    "connection reset",
];

/// Returns true if `message` reports a severed, refused or closed connection
pub fn is_transient_message(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_PHRASES.iter().any(|phrase| message.contains(phrase))
}

/// Errors raised while acquiring sessions or running units of work
#[derive(Debug, Error)]
pub enum DbError {
    /// The driver lost or could not reach the connection
    #[error("Connection lost: {message}")]
    Disconnected { message: String },

    /// Operational failure reported by the server
    ///
    /// Retryable only when the message names a connection failure.
    #[error("Operational error: {message}")]
    Operational { message: String },

    /// Any other error reported by the database
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: Option<String>,
    },

    /// Connection settings could not be used
    #[error("Invalid database configuration: {0}")]
    Configuration(String),

    /// The blocking API was called from inside an async runtime
    #[error("Blocking database call made from within an async runtime")]
    BlockingInAsyncContext,

    /// The runtime driving the driver could not be started
    #[error("Failed to start database runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Failure raised by the unit of work itself
    #[error("{0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

impl DbError {
    /// Creates an operational error
    pub fn operational(message: impl Into<String>) -> Self {
        Self::Operational {
            message: message.into(),
        }
    }

    /// Creates a database error without a vendor code
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: None,
        }
    }

    /// Wraps a non-database failure raised by a unit of work
    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Returns true for connection-class failures
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Disconnected { .. } => true,
            Self::Operational { message } => is_transient_message(message),
            _ => false,
        }
    }
}

impl Classify for DbError {
    fn classification(&self) -> Classification {
        if self.is_transient() {
            Classification::Retryable
        } else {
            Classification::Fatal
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Disconnected {
                message: err.to_string(),
            },
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if is_transient_message(&message) {
                    Self::Operational { message }
                } else {
                    Self::Database {
                        message,
                        code: db_err.code().map(|c| c.into_owned()),
                    }
                }
            }
            sqlx::Error::Configuration(_) => Self::Configuration(err.to_string()),
            _ => Self::database(err.to_string()),
        }
    }
}
