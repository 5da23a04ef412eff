// crates/config/src/database_config.rs
//! Database configuration section

use crate::validation::{ConfigSection, Report};
use rampart_database::PoolConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection pool and unit-of-work retry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// Retries of a unit of work after connection failures
    pub max_retries: usize,

    /// Delay unit between retries in milliseconds; the n-th retry waits n times this
    pub retry_delay_ms: u64,

    /// Seconds to wait for a connection
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:rampart.db".to_string(),
            max_connections: 5,
            max_retries: 3,
            retry_delay_ms: 1000,
            connect_timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Pool settings for [`rampart_database::SqliteSessionSource::connect`]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.url.clone())
            .with_max_connections(self.max_connections)
            .with_connect_timeout(self.connect_timeout())
    }
}

impl ConfigSection for DatabaseConfig {
    const NAME: &'static str = "database";

    fn check(&self, report: &mut Report) {
        report
            .filled("url", &self.url)
            .prefixed("url", &self.url, "sqlite:")
            .within("max_connections", self.max_connections, 1..=100)
            .within("max_retries", self.max_retries, 0..=10)
            .within("retry_delay_ms", self.retry_delay_ms, 0..=60_000)
            .within("connect_timeout_secs", self.connect_timeout_secs, 1..=300);
    }
}
