// crates/resilience/src/cache.rs
//! In-memory TTL cache with lazy eviction

use rampart_core::{Clock, SystemClock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default time-to-live for entries stored without an explicit ttl
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A cached value with its lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Stored payload
    pub value: V,
    /// When the entry was written
    pub created_at: Instant,
    /// When the entry stops being served, `None` if never
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// All stored entries, live or not yet evicted
    pub total_keys: usize,
    /// Entries that would be served by `get`
    pub active_keys: usize,
    /// Entries past their expiry still waiting for a read to evict them
    pub expired_keys: usize,
}

/// Thread-safe TTL cache
///
/// Expired entries are never swept in the background; a `get` that finds
/// one removes it. Writes always overwrite.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a cache using the system clock
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    /// Returns the ttl used by [`TtlCache::set_default`]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Gets a live value, evicting it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                log::debug!("Cache entry '{}' expired and was evicted", key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores a value that expires after `ttl`
    ///
    /// A ttl too long to represent as an instant keeps the entry until it is
    /// deleted or overwritten.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now.checked_add(ttl),
        };
        self.lock().insert(key.into(), entry);
    }

    /// Stores a value with the default ttl
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Removes an entry, returning whether one existed
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Counts total, active and expired entries without evicting anything
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.lock();
        let active_keys = entries.values().filter(|e| !e.is_expired(now)).count();

        CacheStats {
            total_keys: entries.len(),
            active_keys,
            expired_keys: entries.len() - active_keys,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Deterministic cache key built from an operation name and its parameters
///
/// Parameters are sorted before rendering, so the same multiset of
/// parameters produces the same key regardless of the order they were added.
///
/// ```rust
/// use rampart_resilience::CacheKey;
///
/// let a = CacheKey::new("web_search").param("query", "shoes").param("count", 10);
/// let b = CacheKey::new("web_search").param("count", 10).param("query", "shoes");
/// assert_eq!(a.to_string(), b.to_string());
/// assert_eq!(a.to_string(), "web_search:count=10&query=shoes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    operation: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    /// Starts a key for the named operation
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter
    pub fn param(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Renders the key
    pub fn build(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params: Vec<&(String, String)> = self.params.iter().collect();
        params.sort();

        write!(f, "{}:", self.operation)?;
        for (i, (name, value)) in params.into_iter().enumerate() {
            if i > 0 {
                write!(f, "&")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::ManualClock;

    fn manual_cache(ttl: Duration) -> (ManualClock, TtlCache<String>) {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock(ttl, Arc::new(clock.clone()));
        (clock, cache)
    }

    #[test]
    fn test_set_and_get() {
        let (_clock, cache) = manual_cache(Duration::from_secs(60));
        cache.set_default("q1", "r1".to_string());
        assert_eq!(cache.get("q1"), Some("r1".to_string()));
    }

    #[test]
    fn test_get_missing_key() {
        let (_clock, cache) = manual_cache(Duration::from_secs(60));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let (clock, cache) = manual_cache(Duration::from_secs(60));
        cache.set("q1", "r1".to_string(), Duration::from_secs(2));

        clock.advance(Duration::from_millis(1999));
        assert!(cache.get("q1").is_some());

        clock.advance(Duration::from_millis(1));
        assert!(cache.get("q1").is_none());
    }

    #[test]
    fn test_expired_read_evicts_entry() {
        let (clock, cache) = manual_cache(Duration::from_secs(1));
        cache.set_default("k", "v".to_string());
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.stats().total_keys, 1);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().total_keys, 0);
    }

    #[test]
    fn test_unbounded_ttl_never_expires() {
        let (clock, cache) = manual_cache(Duration::MAX);
        cache.set("forever", "v".to_string(), Duration::MAX);
        cache.set_default("also", "w".to_string());

        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert_eq!(cache.get("forever"), Some("v".to_string()));
        assert_eq!(cache.get("also"), Some("w".to_string()));
        assert_eq!(cache.stats().active_keys, 2);
    }

    #[test]
    fn test_set_overwrites_and_resets_ttl() {
        let (clock, cache) = manual_cache(Duration::from_secs(60));
        cache.set("k", "old".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_millis(900));
        cache.set("k", "new".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_millis(900));

        assert_eq!(cache.get("k"), Some("new".to_string()));
        assert_eq!(cache.stats().total_keys, 1);
    }

    #[test]
    fn test_delete_and_clear() {
        let (_clock, cache) = manual_cache(Duration::from_secs(60));
        cache.set_default("a", "1".to_string());
        cache.set_default("b", "2".to_string());

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert!(cache.get("a").is_none());

        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_stats_counts_expired_without_evicting() {
        let (clock, cache) = manual_cache(Duration::from_secs(60));
        cache.set("short", "1".to_string(), Duration::from_secs(1));
        cache.set("long", "2".to_string(), Duration::from_secs(100));
        clock.advance(Duration::from_secs(5));

        let stats = cache.stats();
        assert_eq!(stats.total_keys, 2);
        assert_eq!(stats.active_keys, 1);
        assert_eq!(stats.expired_keys, 1);
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = CacheKey::new("web_search")
            .param("query", "running shoes")
            .param("count", 10);
        let b = CacheKey::new("web_search")
            .param("count", 10)
            .param("query", "running shoes");

        assert_eq!(a.build(), b.build());
        assert_eq!(a.build(), "web_search:count=10&query=running shoes");
    }

    #[test]
    fn test_cache_key_distinguishes_values_and_operations() {
        let a = CacheKey::new("web_search").param("count", 5);
        let b = CacheKey::new("web_search").param("count", 10);
        let c = CacheKey::new("trend").param("count", 5);

        assert_ne!(a.build(), b.build());
        assert_ne!(a.build(), c.build());
    }

    #[test]
    fn test_cache_key_without_params() {
        assert_eq!(CacheKey::new("status").build(), "status:");
    }
}
