// crates/guard/src/status.rs
//! Service status report

use crate::guard::{Guard, KNOWN_SERVICES};
use rampart_resilience::CacheStats;
use serde::Serialize;
use std::path::PathBuf;

/// Availability of one service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceReport {
    pub service: String,
    pub available: bool,
    /// Human-readable state
    pub status: String,
    /// Seconds since the state was last reported or re-evaluated, if ever
    pub last_checked_secs_ago: Option<u64>,
    /// Seconds of cooldown left while unavailable
    pub cooldown_remaining_secs: Option<u64>,
}

/// Snapshot of the guard's health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub services: Vec<ServiceReport>,
    pub cache_total_keys: usize,
    pub cache_active_keys: usize,
    pub cache_expired_keys: usize,
    pub fallback_data_dir: PathBuf,
}

impl StatusReport {
    pub fn service(&self, name: &str) -> Option<&ServiceReport> {
        self.services.iter().find(|s| s.service == name)
    }
}

impl Guard {
    /// Reports every known service plus any other service that has reported
    ///
    /// Checking availability here can reopen a service whose cooldown has
    /// passed, exactly as a call would.
    pub fn status(&self) -> StatusReport {
        let mut names: Vec<String> = KNOWN_SERVICES.iter().map(|s| s.to_string()).collect();
        for service in self.availability.services() {
            if !names.contains(&service) {
                names.push(service);
            }
        }

        let now = self.clock.now();
        let services = names
            .into_iter()
            .map(|service| {
                let available = self.availability.is_available(&service);
                let status = self.availability.status(&service);
                let label = if available { "available" } else { "throttled/unavailable" };
                ServiceReport {
                    available,
                    status: label.to_string(),
                    last_checked_secs_ago: status
                        .as_ref()
                        .map(|s| now.saturating_duration_since(s.last_checked_at).as_secs()),
                    cooldown_remaining_secs: status
                        .and_then(|s| s.cooldown_remaining(now))
                        .map(|d| d.as_secs()),
                    service,
                }
            })
            .collect();

        let CacheStats {
            total_keys,
            active_keys,
            expired_keys,
        } = self.cache.stats();

        StatusReport {
            services,
            cache_total_keys: total_keys,
            cache_active_keys: active_keys,
            cache_expired_keys: expired_keys,
            fallback_data_dir: self.fallback.store().data_dir().to_path_buf(),
        }
    }
}
