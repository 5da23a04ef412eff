// crates/fallback/src/degraded.rs
//! Degraded reads over the snapshot store
//!
//! These helpers are what callers reach for when a live dependency refuses
//! service. Each one always produces a [`Response`] with fallback origin: with
//! the last saved payload when a snapshot exists, or without data and with an
//! explanation when none was ever saved.

use crate::error::FallbackResult;
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use rampart_core::Response;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Most search results kept per snapshot
pub const DEFAULT_MAX_SAVED_RESULTS: usize = 20;

/// Platform used when a caller does not name one
pub const DEFAULT_PLATFORM: &str = "general";

/// Data type under which supplier records are stored
pub const SUPPLIERS_DATA_TYPE: &str = "suppliers";

const SEARCH_UNAVAILABLE: &str = "Search service is throttled, please retry later. \
     The request has been noted and will be served once the service recovers.";
const SEARCH_FROM_SNAPSHOT: &str =
    "Search service is throttled, returning cached historical search results.";
const TREND_UNAVAILABLE: &str =
    "Trend analysis service is throttled, live data is unavailable. Please retry later.";
const TREND_FROM_SNAPSHOT: &str =
    "Trend analysis service is throttled, returning cached historical trend data.";
const SUPPLIERS_UNAVAILABLE: &str =
    "Database service is throttled, supplier data is unavailable. Please retry later.";
const SUPPLIERS_FROM_SNAPSHOT: &str =
    "Database service is throttled, returning cached supplier data.";

/// Snapshot of the most recent search for a platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSnapshot {
    pub keyword: String,
    pub results: Vec<Value>,
    pub cached_at: DateTime<Utc>,
}

/// Search results substituted while the search service is refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackSearch {
    pub platform: String,
    /// Keyword the caller asked for
    pub keyword: String,
    /// Keyword the snapshot was saved under, which may differ
    pub cached_keyword: String,
    pub total_results: usize,
    pub results: Vec<Value>,
    pub cached_at: DateTime<Utc>,
}

/// Snapshot of trend figures for a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub category: String,
    pub trend_data: Value,
    pub cached_at: DateTime<Utc>,
}

/// Trend figures substituted while the trend service is refused
///
/// Growth rates missing from the snapshot read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub category: String,
    pub days: u32,
    pub avg_growth_rate: f64,
    pub max_growth_rate: f64,
    pub min_growth_rate: f64,
    pub cached_at: DateTime<Utc>,
}

impl TrendSummary {
    /// Reads the growth rates out of raw trend figures
    pub fn from_trend_data(
        category: &str,
        days: u32,
        trend_data: &Value,
        cached_at: DateTime<Utc>,
    ) -> Self {
        let rate = |field: &str| trend_data.get(field).and_then(Value::as_f64).unwrap_or(0.0);
        Self {
            category: category.to_string(),
            days,
            avg_growth_rate: rate("avg_growth_rate"),
            max_growth_rate: rate("max_growth_rate"),
            min_growth_rate: rate("min_growth_rate"),
            cached_at,
        }
    }
}

/// A stored supplier record
///
/// Only the fields used for filtering are typed; everything else is kept as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRecord {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SupplierRecord {
    fn matches(&self, filter: &SupplierFilter) -> bool {
        if let Some(category) = &filter.category {
            if !self.categories.iter().any(|c| c == category) {
                return false;
            }
        }
        if filter.region.is_some() && self.region != filter.region {
            return false;
        }
        if filter.platform.is_some() && self.platform != filter.platform {
            return false;
        }
        true
    }
}

/// Filter applied to cached suppliers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierFilter {
    pub category: Option<String>,
    pub region: Option<String>,
    pub platform: Option<String>,
    pub limit: usize,
}

impl SupplierFilter {
    /// Keeps matching records, truncated to the limit
    pub fn apply(&self, records: Vec<SupplierRecord>) -> SupplierList {
        let matched: Vec<SupplierRecord> =
            records.into_iter().filter(|s| s.matches(self)).collect();
        let total = matched.len();
        let suppliers = matched.into_iter().take(self.limit).collect();
        SupplierList { total, suppliers }
    }
}

impl Default for SupplierFilter {
    fn default() -> Self {
        Self {
            category: None,
            region: None,
            platform: None,
            limit: 10,
        }
    }
}

/// Suppliers substituted while the database is refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierList {
    /// Number of matches before the limit was applied
    pub total: usize,
    pub suppliers: Vec<SupplierRecord>,
}

/// Saves last-known-good payloads and serves them back as degraded responses
#[derive(Debug, Clone)]
pub struct FallbackService {
    store: SnapshotStore,
    max_saved_results: usize,
}

impl FallbackService {
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            max_saved_results: DEFAULT_MAX_SAVED_RESULTS,
        }
    }

    /// Sets how many search results are kept per snapshot
    pub fn with_max_saved_results(mut self, max_saved_results: usize) -> Self {
        self.max_saved_results = max_saved_results;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn max_saved_results(&self) -> usize {
        self.max_saved_results
    }

    fn search_data_type(platform: &str) -> String {
        format!("search_{}", platform)
    }

    fn trend_data_type(category: &str) -> String {
        format!("trend_{}", category)
    }

    /// Saves the leading search results for a platform
    pub fn save_search_results(
        &self,
        keyword: &str,
        platform: &str,
        results: &[Value],
    ) -> FallbackResult<()> {
        let kept = results.len().min(self.max_saved_results);
        let snapshot = SearchSnapshot {
            keyword: keyword.to_string(),
            results: results[..kept].to_vec(),
            cached_at: Utc::now(),
        };
        self.store
            .save(&Self::search_data_type(platform), &snapshot)
    }

    /// Saves trend figures for a category
    pub fn save_trend_data(&self, category: &str, trend_data: Value) -> FallbackResult<()> {
        let snapshot = TrendSnapshot {
            category: category.to_string(),
            trend_data,
            cached_at: Utc::now(),
        };
        self.store.save(&Self::trend_data_type(category), &snapshot)
    }

    /// Replaces the cached supplier records
    pub fn save_suppliers(&self, suppliers: &[SupplierRecord]) -> FallbackResult<()> {
        self.store.save(SUPPLIERS_DATA_TYPE, &suppliers)
    }

    /// Returns the last saved search results for a platform
    pub fn search_results(&self, keyword: &str, platform: &str) -> Response<FallbackSearch> {
        match self
            .store
            .load::<SearchSnapshot>(&Self::search_data_type(platform))
        {
            Some(snapshot) => {
                log::info!(
                    "Serving {} cached search results for '{}' on {}",
                    snapshot.results.len(),
                    keyword,
                    platform
                );
                let data = FallbackSearch {
                    platform: platform.to_string(),
                    keyword: keyword.to_string(),
                    cached_keyword: snapshot.keyword,
                    total_results: snapshot.results.len(),
                    results: snapshot.results,
                    cached_at: snapshot.cached_at,
                };
                Response::fallback(Some(data), SEARCH_FROM_SNAPSHOT)
            }
            None => Response::fallback(None, SEARCH_UNAVAILABLE),
        }
    }

    /// Returns the last saved trend figures for a category
    pub fn trend_data(&self, category: &str, days: u32) -> Response<TrendSummary> {
        let Some(snapshot) = self
            .store
            .load::<TrendSnapshot>(&Self::trend_data_type(category))
        else {
            return Response::fallback(None, TREND_UNAVAILABLE);
        };

        let data =
            TrendSummary::from_trend_data(category, days, &snapshot.trend_data, snapshot.cached_at);
        Response::fallback(Some(data), TREND_FROM_SNAPSHOT)
    }

    /// Returns cached suppliers matching `filter`
    ///
    /// Always carries a list; it is empty when nothing was ever cached.
    pub fn suppliers(&self, filter: &SupplierFilter) -> Response<SupplierList> {
        let Some(records) = self.store.load::<Vec<SupplierRecord>>(SUPPLIERS_DATA_TYPE) else {
            let empty = SupplierList {
                total: 0,
                suppliers: Vec::new(),
            };
            return Response::fallback(Some(empty), SUPPLIERS_UNAVAILABLE);
        };

        Response::fallback(Some(filter.apply(records)), SUPPLIERS_FROM_SNAPSHOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FallbackService) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SnapshotStore::open(temp_dir.path()).expect("open store");
        (temp_dir, FallbackService::new(store))
    }

    fn supplier(name: &str, categories: &[&str], region: &str, platform: &str) -> SupplierRecord {
        let mut extra = Map::new();
        extra.insert("name".to_string(), json!(name));
        SupplierRecord {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            region: Some(region.to_string()),
            platform: Some(platform.to_string()),
            extra,
        }
    }

    #[test]
    fn test_search_without_snapshot() {
        let (_dir, service) = setup();
        let response = service.search_results("tea", DEFAULT_PLATFORM);

        assert!(response.is_fallback());
        assert!(response.data.is_none());
        assert!(response.message.is_some());
    }

    #[test]
    fn test_search_results_truncated_on_save() {
        let (_dir, service) = setup();
        let results: Vec<Value> = (0..30).map(|i| json!({"title": i})).collect();
        service
            .save_search_results("tea", DEFAULT_PLATFORM, &results)
            .expect("save");

        let response = service.search_results("coffee", DEFAULT_PLATFORM);
        let data = response.data.expect("snapshot data");
        assert_eq!(data.total_results, 20);
        assert_eq!(data.results[0], json!({"title": 0}));
        assert_eq!(data.keyword, "coffee");
        assert_eq!(data.cached_keyword, "tea");
    }

    #[test]
    fn test_search_snapshots_are_per_platform() {
        let (_dir, service) = setup();
        service
            .save_search_results("tea", "wholesale", &[json!("a")])
            .expect("save");

        assert!(service.search_results("tea", "retail").data.is_none());
        assert!(service.search_results("tea", "wholesale").data.is_some());
    }

    #[test]
    fn test_trend_defaults_missing_rates_to_zero() {
        let (_dir, service) = setup();
        service
            .save_trend_data("tea", json!({"avg_growth_rate": 12.5, "max_growth_rate": 30}))
            .expect("save");

        let data = service.trend_data("tea", 30).data.expect("trend data");
        assert_eq!(data.avg_growth_rate, 12.5);
        assert_eq!(data.max_growth_rate, 30.0);
        assert_eq!(data.min_growth_rate, 0.0);
        assert_eq!(data.days, 30);
    }

    #[test]
    fn test_trend_without_snapshot() {
        let (_dir, service) = setup();
        let response = service.trend_data("tea", 7);
        assert!(response.is_fallback());
        assert!(response.data.is_none());
    }

    #[test]
    fn test_suppliers_without_snapshot_is_empty_list() {
        let (_dir, service) = setup();
        let response = service.suppliers(&SupplierFilter::default());

        let data = response.data.expect("empty list");
        assert_eq!(data.total, 0);
        assert!(data.suppliers.is_empty());
    }

    #[test]
    fn test_suppliers_filter_and_limit() {
        let (_dir, service) = setup();
        service
            .save_suppliers(&[
                supplier("a", &["tea"], "east", "retail"),
                supplier("b", &["tea", "coffee"], "east", "wholesale"),
                supplier("c", &["coffee"], "east", "retail"),
                supplier("d", &["tea"], "west", "retail"),
            ])
            .expect("save");

        let filter = SupplierFilter {
            category: Some("tea".to_string()),
            region: Some("east".to_string()),
            limit: 1,
            ..SupplierFilter::default()
        };
        let data = service.suppliers(&filter).data.expect("suppliers");

        assert_eq!(data.total, 2);
        assert_eq!(data.suppliers.len(), 1);
        assert_eq!(data.suppliers[0].extra.get("name"), Some(&json!("a")));
    }

    #[test]
    fn test_supplier_extra_fields_preserved() {
        let raw = json!({"name": "Acme", "categories": ["tea"], "rating": 4.5});
        let record: SupplierRecord = serde_json::from_value(raw.clone()).expect("parse");

        assert_eq!(record.categories, vec!["tea"]);
        assert!(record.region.is_none());
        assert_eq!(serde_json::to_value(&record).expect("serialize"), raw);
    }
}
