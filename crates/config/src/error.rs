// crates/config/src/error.rs
//! Error types for loading and saving config files

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file or its directory could not be written
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`crate::Config`]
    #[error("Malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// One or more values are out of range, all of them listed
    #[error("{} invalid value(s): {}", .0.len(), list(.0))]
    Invalid(Vec<ValidationError>),

    /// The platform reports no home or config directory
    #[error("No config directory available on this platform")]
    NoConfigDir,

    /// A `RAMPART_*` variable holds a value its field cannot take
    #[error("Invalid value for {var}: '{value}'")]
    EnvOverride { var: String, value: String },
}

fn list(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One invalid field, named by its dotted path such as `retry.max_delay_ms`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
