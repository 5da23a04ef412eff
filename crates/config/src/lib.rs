// crates/config/src/lib.rs
//! Rampart Configuration System
//!
//! One TOML file holds a table per component of the resilience layer, and
//! each table builds the runtime type it configures. Keys left out of the
//! file take their defaults. `RAMPART_<TABLE>_<KEY>` environment variables
//! win over the file, and the result is validated as a whole before use.
//!
//! ```rust,no_run
//! use rampart_config::ConfigManager;
//!
//! # fn main() -> rampart_config::ConfigResult<()> {
//! let config = ConfigManager::new()?.load()?;
//! let policy = config.retry.policy();
//! println!("Retrying up to {} times", policy.max_retries());
//! # Ok(())
//! # }
//! ```

mod database_config;
mod error;
mod fallback_config;
mod manager;
mod overrides;
mod persistence;
mod resilience_config;
mod validation;

pub use database_config::DatabaseConfig;
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use fallback_config::FallbackConfig;
pub use manager::ConfigManager;
pub use overrides::ENV_PREFIX;
pub use resilience_config::{
    AvailabilityConfig, BatchConfig, CacheConfig, ParallelConfig, RateLimitConfig, RetryConfig,
};
pub use validation::{ConfigSection, Report};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub availability: AvailabilityConfig,
    pub retry: RetryConfig,
    pub parallel: ParallelConfig,
    pub database: DatabaseConfig,
    pub fallback: FallbackConfig,
    pub batch: BatchConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every table, returning all invalid values in file order
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut report = Report::default();
        report
            .section(&self.cache)
            .section(&self.rate_limit)
            .section(&self.availability)
            .section(&self.retry)
            .section(&self.parallel)
            .section(&self.database)
            .section(&self.fallback)
            .section(&self.batch);
        report.finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            availability: AvailabilityConfig::default(),
            retry: RetryConfig::default(),
            parallel: ParallelConfig::default(),
            database: DatabaseConfig::default(),
            fallback: FallbackConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}
