// crates/resilience/src/availability.rs
//! Service availability tracking (cooldown circuit breaker)

use crate::error::{ResilienceError, ResilienceResult};
use rampart_core::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default cooldown applied by [`AvailabilityTracker::report_failure`]
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Availability state of a tracked service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityState {
    /// Calls may be routed to the service
    Available,
    /// Calls should be replaced with fallback data until the instant passes
    ///
    /// `None` is a cooldown too long to represent, which never ends on its own.
    Unavailable { until: Option<Instant> },
}

/// Last known status of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Service name
    pub service: String,
    /// Whether calls may be routed to the service
    pub available: bool,
    /// When the status was last reported or re-evaluated
    pub last_checked_at: Instant,
    /// End of the cooldown, only meaningful while unavailable
    ///
    /// `None` while unavailable means the cooldown has no scheduled end.
    pub cooldown_until: Option<Instant>,
}

impl ServiceStatus {
    /// Returns the state as an enum
    pub fn state(&self) -> AvailabilityState {
        if self.available {
            AvailabilityState::Available
        } else {
            AvailabilityState::Unavailable {
                until: self.cooldown_until,
            }
        }
    }

    /// Returns the remaining cooldown at `now`, if the service is unavailable
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        match self.state() {
            AvailabilityState::Unavailable { until: Some(until) } => {
                Some(until.saturating_duration_since(now))
            }
            AvailabilityState::Unavailable { until: None } => Some(Duration::MAX),
            AvailabilityState::Available => None,
        }
    }
}

/// Tracks which services are temporarily unavailable
///
/// A failure report puts the service into cooldown. Reopening is lazy and
/// optimistic: the first availability check at or after the end of the
/// cooldown flips the service back to available without probing it.
/// Services that were never reported are available.
#[derive(Debug)]
pub struct AvailabilityTracker {
    services: Mutex<HashMap<String, ServiceStatus>>,
    default_cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl AvailabilityTracker {
    /// Creates a tracker using the system clock
    pub fn new(default_cooldown: Duration) -> Self {
        Self::with_clock(default_cooldown, Arc::new(SystemClock))
    }

    /// Creates a tracker reading time from `clock`
    pub fn with_clock(default_cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
            default_cooldown,
            clock,
        }
    }

    /// Returns the cooldown used by [`AvailabilityTracker::report_failure`]
    pub fn default_cooldown(&self) -> Duration {
        self.default_cooldown
    }

    /// Marks a service available, clearing any cooldown
    pub fn mark_available(&self, service: &str) {
        let now = self.clock.now();
        let mut services = self.lock();
        services.insert(
            service.to_string(),
            ServiceStatus {
                service: service.to_string(),
                available: true,
                last_checked_at: now,
                cooldown_until: None,
            },
        );
    }

    /// Marks a service unavailable for `cooldown`
    pub fn mark_unavailable(&self, service: &str, cooldown: Duration) {
        let now = self.clock.now();
        log::warn!(
            "Service '{}' marked unavailable for {:?}",
            service,
            cooldown
        );

        let mut services = self.lock();
        services.insert(
            service.to_string(),
            ServiceStatus {
                service: service.to_string(),
                available: false,
                last_checked_at: now,
                cooldown_until: now.checked_add(cooldown),
            },
        );
    }

    /// Marks a service unavailable for the default cooldown
    pub fn report_failure(&self, service: &str) {
        self.mark_unavailable(service, self.default_cooldown);
    }

    /// Returns whether calls may be routed to `service`
    ///
    /// Flips an expired cooldown back to available as a side effect.
    pub fn is_available(&self, service: &str) -> bool {
        let now = self.clock.now();
        let mut services = self.lock();

        let Some(status) = services.get_mut(service) else {
            return true;
        };

        if let AvailabilityState::Unavailable { until: Some(until) } = status.state() {
            if now >= until {
                status.available = true;
                status.cooldown_until = None;
                status.last_checked_at = now;
                log::info!("Cooldown elapsed, service '{}' is available again", service);
            }
        }

        status.available
    }

    /// Like [`AvailabilityTracker::is_available`] but returns a typed error
    pub fn check(&self, service: &str) -> ResilienceResult<()> {
        if self.is_available(service) {
            return Ok(());
        }

        let remaining = self
            .status(service)
            .and_then(|s| s.cooldown_remaining(self.clock.now()))
            .unwrap_or_default();

        Err(ResilienceError::ServiceUnavailable {
            service: service.to_string(),
            remaining,
        })
    }

    /// Returns the recorded status without re-evaluating the cooldown
    ///
    /// `None` means the service was never reported.
    pub fn status(&self, service: &str) -> Option<ServiceStatus> {
        self.lock().get(service).cloned()
    }

    /// Returns the names of every service that has been reported, sorted
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ServiceStatus>> {
        self.services
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AvailabilityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
