// crates/config/src/overrides.rs
//! Environment variable overrides
//!
//! Variables follow `RAMPART_<SECTION>_<FIELD>`, for example
//! `RAMPART_RETRY_MAX_RETRIES=5` or `RAMPART_DATABASE_URL=sqlite:/tmp/r.db`.

use crate::{Config, ConfigError, ConfigResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix shared by every override variable
pub const ENV_PREFIX: &str = "RAMPART_";

fn parse<T: FromStr>(var: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvOverride {
            var: var.to_string(),
            value: value.to_string(),
        })
}

impl Config {
    /// Applies a single override
    ///
    /// Returns `Ok(false)` when `var` names no known field.
    pub fn apply_override(&mut self, var: &str, value: &str) -> ConfigResult<bool> {
        let Some(key) = var.strip_prefix(ENV_PREFIX) else {
            return Ok(false);
        };

        match key {
            "CACHE_DEFAULT_TTL_SECS" => self.cache.default_ttl_secs = parse(var, value)?,
            "CACHE_SEARCH_TTL_SECS" => self.cache.search_ttl_secs = parse(var, value)?,
            "RATE_LIMIT_MAX_CALLS" => self.rate_limit.max_calls = parse(var, value)?,
            "RATE_LIMIT_WINDOW_SECS" => self.rate_limit.window_secs = parse(var, value)?,
            "AVAILABILITY_COOLDOWN_SECS" => self.availability.cooldown_secs = parse(var, value)?,
            "RETRY_MAX_RETRIES" => self.retry.max_retries = parse(var, value)?,
            "RETRY_BASE_DELAY_MS" => self.retry.base_delay_ms = parse(var, value)?,
            "RETRY_MAX_DELAY_MS" => self.retry.max_delay_ms = parse(var, value)?,
            "RETRY_BACKOFF_FACTOR" => self.retry.backoff_factor = parse(var, value)?,
            "RETRY_JITTER" => self.retry.jitter = parse(var, value)?,
            "PARALLEL_WORKERS" => self.parallel.workers = parse(var, value)?,
            "PARALLEL_TASK_TIMEOUT_MS" => self.parallel.task_timeout_ms = parse(var, value)?,
            "DATABASE_URL" => self.database.url = value.to_string(),
            "DATABASE_MAX_CONNECTIONS" => self.database.max_connections = parse(var, value)?,
            "DATABASE_MAX_RETRIES" => self.database.max_retries = parse(var, value)?,
            "DATABASE_RETRY_DELAY_MS" => self.database.retry_delay_ms = parse(var, value)?,
            "DATABASE_CONNECT_TIMEOUT_SECS" => {
                self.database.connect_timeout_secs = parse(var, value)?
            }
            "FALLBACK_DATA_DIR" => self.fallback.data_dir = PathBuf::from(value),
            "FALLBACK_MAX_SAVED_RESULTS" => self.fallback.max_saved_results = parse(var, value)?,
            "BATCH_DELAY_MS" => self.batch.delay_ms = parse(var, value)?,
            "BATCH_RESULT_COUNT" => self.batch.result_count = parse(var, value)?,
            _ => return Ok(false),
        }

        Ok(true)
    }

    /// Applies every recognised `RAMPART_*` variable from `vars`
    ///
    /// Returns how many were applied. Stops at the first value its field
    /// cannot take; overrides applied before it are kept.
    pub fn apply_env_overrides<I, K, V>(&mut self, vars: I) -> ConfigResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut applied = 0;
        for (var, value) in vars {
            let (var, value) = (var.as_ref(), value.as_ref());
            if !var.starts_with(ENV_PREFIX) {
                continue;
            }
            if self.apply_override(var, value)? {
                log::info!("Config override from {}", var);
                applied += 1;
            } else {
                log::debug!("Ignoring unknown config variable {}", var);
            }
        }
        Ok(applied)
    }
}
