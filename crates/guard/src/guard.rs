// crates/guard/src/guard.rs
//! The guarded entry point shared by every read
//!
//! A [`Guard`] owns one instance of each resilience component, built from a
//! [`Config`] at startup. The search, batch, refinement and status
//! operations live in sibling modules as further `impl Guard` blocks.

use crate::backend::{SearchBackend, SearchOutput};
use crate::error::{GuardError, GuardResult};
use rampart_config::Config;
use rampart_core::{Clock, SystemClock};
use rampart_fallback::{FallbackService, SnapshotStore, DEFAULT_PLATFORM};
use rampart_resilience::{AvailabilityTracker, ParallelExecutor, RateLimiters, TtlCache};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Availability and rate-limit key of the web search service
pub const SEARCH_SERVICE: &str = "search";

/// Availability key of the database
pub const DATABASE_SERVICE: &str = "database";

/// Availability key of the trend service
pub const TREND_SERVICE: &str = "trend";

/// Services always listed in a status report
pub const KNOWN_SERVICES: [&str; 3] = [SEARCH_SERVICE, DATABASE_SERVICE, TREND_SERVICE];

/// Tunables copied out of the configuration
#[derive(Debug, Clone)]
pub struct GuardSettings {
    /// Time-to-live of cached search results
    pub search_ttl: Duration,
    /// Cooldown applied when a live call fails
    pub cooldown: Duration,
    /// Pause between live calls of a batch
    pub batch_delay: Duration,
    /// Results requested per batch query
    pub batch_result_count: usize,
    /// Platform search snapshots are saved under
    pub platform: String,
}

impl GuardSettings {
    fn from_config(config: &Config) -> Self {
        Self {
            search_ttl: config.cache.search_ttl(),
            cooldown: config.availability.cooldown(),
            batch_delay: config.batch.delay(),
            batch_result_count: config.batch.result_count,
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

/// Resilience layer in front of a search backend and the snapshot store
pub struct Guard {
    pub(crate) backend: Arc<dyn SearchBackend>,
    pub(crate) cache: TtlCache<SearchOutput>,
    pub(crate) limiters: RateLimiters,
    pub(crate) availability: AvailabilityTracker,
    pub(crate) fallback: FallbackService,
    pub(crate) executor: ParallelExecutor,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: GuardSettings,
}

impl Guard {
    /// Builds a guard on the system clock
    pub fn from_config(config: &Config, backend: Arc<dyn SearchBackend>) -> GuardResult<Self> {
        Self::with_clock(config, backend, Arc::new(SystemClock))
    }

    /// Builds a guard whose cache, limiters, breaker and pacing read `clock`
    ///
    /// The configuration is validated first; every problem found is
    /// reported in one [`GuardError::Config`].
    pub fn with_clock(
        config: &Config,
        backend: Arc<dyn SearchBackend>,
        clock: Arc<dyn Clock>,
    ) -> GuardResult<Self> {
        if let Err(errors) = config.validate() {
            let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(GuardError::Config(details.join("; ")));
        }

        let store = SnapshotStore::open(&config.fallback.data_dir)?;
        let fallback =
            FallbackService::new(store).with_max_saved_results(config.fallback.max_saved_results);

        let guard = Self {
            backend,
            cache: TtlCache::with_clock(config.cache.default_ttl(), Arc::clone(&clock)),
            limiters: RateLimiters::with_clock(
                config.rate_limit.max_calls,
                config.rate_limit.window(),
                Arc::clone(&clock),
            ),
            availability: AvailabilityTracker::with_clock(
                config.availability.cooldown(),
                Arc::clone(&clock),
            ),
            fallback,
            executor: config.parallel.executor()?,
            clock,
            settings: GuardSettings::from_config(config),
        };

        log::info!(
            "Guard ready: {} workers, snapshots in {}",
            guard.executor.workers(),
            guard.fallback.store().data_dir().display()
        );
        Ok(guard)
    }

    /// Saves snapshots for this platform instead of the default one
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.settings.platform = platform.into();
        self
    }

    pub fn settings(&self) -> &GuardSettings {
        &self.settings
    }

    pub fn cache(&self) -> &TtlCache<SearchOutput> {
        &self.cache
    }

    pub fn availability(&self) -> &AvailabilityTracker {
        &self.availability
    }

    pub fn limiters(&self) -> &RateLimiters {
        &self.limiters
    }

    pub fn fallback(&self) -> &FallbackService {
        &self.fallback
    }

    pub fn executor(&self) -> &ParallelExecutor {
        &self.executor
    }

    /// Puts `service` into cooldown after a failed live call
    pub(crate) fn trip(&self, service: &str, error: &dyn fmt::Display) {
        log::warn!("{} call failed: {}", service, error);
        self.availability
            .mark_unavailable(service, self.settings.cooldown);
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("availability", &self.availability)
            .field("executor", &self.executor)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
