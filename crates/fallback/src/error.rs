// crates/fallback/src/error.rs
//! Error types for the fallback snapshot store

use rampart_core::{Classification, Classify};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations
pub type FallbackResult<T> = Result<T, FallbackError>;

/// Errors that can occur while reading or writing snapshots
#[derive(Debug, Error)]
pub enum FallbackError {
    /// Failed to create the snapshot directory
    #[error("Failed to create snapshot directory at {path}: {source}")]
    DirectoryCreationError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a snapshot file
    #[error("Failed to read snapshot at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a snapshot file
    #[error("Failed to write snapshot at {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON for the requested type
    #[error("Failed to parse snapshot at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize a payload
    #[error("Failed to serialize snapshot: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Data type cannot be used as a snapshot name
    #[error("Invalid snapshot data type: '{0}'")]
    InvalidDataType(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Classify for FallbackError {
    fn classification(&self) -> Classification {
        match self {
            Self::ReadError { .. } | Self::WriteError { .. } | Self::IoError(_) => {
                Classification::Retryable
            }
            Self::ParseError { .. } => Classification::Degraded,
            Self::DirectoryCreationError { .. }
            | Self::SerializeError(_)
            | Self::InvalidDataType(_) => Classification::Fatal,
        }
    }
}
