// crates/guard/tests/guard_tests.rs
//! End-to-end tests of guarded reads against a scripted backend

use rampart_config::Config;
use rampart_core::{Clock, ManualClock, Origin};
use rampart_fallback::{SupplierFilter, SupplierRecord};
use rampart_guard::{
    BackendError, Guard, SearchBackend, SearchRequest, SearchResponse, WebItem, BASE_FACET,
    DATABASE_SERVICE, FROM_CACHE_MESSAGE, NO_SNAPSHOT_MESSAGE, SEARCH_SERVICE, TREND_SERVICE,
};
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Answers every query with one result named after it, unless told otherwise
#[derive(Default)]
struct ScriptedBackend {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, (BackendError, usize)>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl ScriptedBackend {
    fn fail(&self, query: &str, error: BackendError, times: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(query.to_string(), (error, times));
    }

    fn delay(&self, query: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, query: &str) -> usize {
        self.calls().iter().filter(|q| q.as_str() == query).count()
    }
}

impl SearchBackend for ScriptedBackend {
    fn web_search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.calls.lock().unwrap().push(request.query.clone());

        let delay = self.delays.lock().unwrap().get(&request.query).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if let Some((error, remaining)) = self.failures.lock().unwrap().get_mut(&request.query) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }

        Ok(SearchResponse {
            summary: Some(format!("About {}", request.query)),
            web_items: vec![WebItem {
                title: format!("{} supplier", request.query),
                url: format!("https://example.com/{}", request.query.replace(' ', "-")),
                snippet: "Wholesale listings".to_string(),
                site_name: "Example".to_string(),
                summary: None,
                publish_time: Some("2026-09-30".to_string()),
            }],
        })
    }
}

struct Fixture {
    _temp_dir: TempDir,
    clock: ManualClock,
    backend: Arc<ScriptedBackend>,
    guard: Guard,
}

fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.fallback.data_dir = temp_dir.path().join("fallback");
    config.parallel.task_timeout_ms = 300;
    config
}

fn fixture_with(adjust: impl FnOnce(&mut Config)) -> Fixture {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(&temp_dir);
    adjust(&mut config);

    let clock = ManualClock::new();
    let backend = Arc::new(ScriptedBackend::default());
    let guard = Guard::with_clock(&config, backend.clone(), Arc::new(clock.clone()))
        .expect("Failed to build guard");

    Fixture {
        _temp_dir: temp_dir,
        clock,
        backend,
        guard,
    }
}

fn fixture() -> Fixture {
    fixture_with(|_| {})
}

fn supplier(name: &str, category: &str, region: &str) -> SupplierRecord {
    let mut extra = Map::new();
    extra.insert("name".to_string(), json!(name));
    SupplierRecord {
        categories: vec![category.to_string()],
        region: Some(region.to_string()),
        platform: None,
        extra,
    }
}

#[test]
fn test_live_search_is_cached_and_snapshotted() {
    let f = fixture();

    let first = f.guard.search("green tea", 10);
    assert_eq!(first.origin, Origin::Live);
    let output = first.data.expect("live data");
    assert_eq!(output.total_results, 1);
    assert_eq!(output.ai_summary, "About green tea");
    assert_eq!(output.results[0].summary, "");

    let second = f.guard.search("green tea", 10);
    assert_eq!(second.origin, Origin::Cached);
    assert_eq!(second.message.as_deref(), Some(FROM_CACHE_MESSAGE));
    assert_eq!(f.backend.calls_for("green tea"), 1);

    let saved = f.guard.fallback().search_results("anything", "general");
    let saved = saved.data.expect("snapshot");
    assert_eq!(saved.cached_keyword, "green tea");
    assert_eq!(saved.results.len(), 1);
}

#[test]
fn test_cache_entry_expires_after_search_ttl() {
    let f = fixture();
    f.guard.search("green tea", 10);

    f.clock.advance(Duration::from_secs(1800));
    let response = f.guard.search("green tea", 10);

    assert_eq!(response.origin, Origin::Live);
    assert_eq!(f.backend.calls_for("green tea"), 2);
}

#[test]
fn test_failure_trips_breaker_and_falls_back() {
    let f = fixture();
    f.guard.search("green tea", 10);

    f.backend
        .fail("oolong", BackendError::Unavailable("connection reset".into()), 5);
    let response = f.guard.search("oolong", 10);

    assert_eq!(response.origin, Origin::Fallback);
    assert!(response.error.as_deref().unwrap_or("").contains("connection reset"));
    let data = response.data.expect("snapshot of the earlier search");
    assert_eq!(data.query, "oolong");
    assert_eq!(data.results[0].title, "green tea supplier");

    assert_eq!(f.backend.calls_for("oolong"), 1);
    assert!(f.clock.sleeps().is_empty());
    assert!(!f.guard.availability().is_available(SEARCH_SERVICE));
}

#[test]
fn test_open_breaker_skips_backend_until_cooldown_passes() {
    let f = fixture();
    f.backend
        .fail("puer", BackendError::InvalidResponse("not json".into()), 1);

    let failed = f.guard.search("puer", 10);
    assert!(failed.is_fallback());
    assert!(failed.data.is_none());
    assert_eq!(f.backend.calls_for("puer"), 1);

    let refused = f.guard.search("puer", 10);
    assert!(refused.is_fallback());
    assert!(refused.error.is_none());
    assert_eq!(f.backend.calls_for("puer"), 1);

    f.clock.advance(Duration::from_secs(300));
    let reopened = f.guard.search("puer", 10);
    assert_eq!(reopened.origin, Origin::Live);
    assert_eq!(f.backend.calls_for("puer"), 2);
}

#[test]
fn test_rate_limit_refusal_falls_back_without_tripping() {
    let f = fixture_with(|c| c.rate_limit.max_calls = 2);

    assert!(!f.guard.search("a", 10).is_degraded());
    assert!(!f.guard.search("b", 10).is_degraded());
    let refused = f.guard.search("c", 10);

    assert!(refused.is_fallback());
    assert!(refused.error.as_deref().unwrap_or("").contains("Rate limit"));
    assert_eq!(f.backend.calls_for("c"), 0);
    assert!(f.guard.availability().is_available(SEARCH_SERVICE));

    f.clock.advance(Duration::from_secs(60));
    assert_eq!(f.guard.search("c", 10).origin, Origin::Live);
}

#[test]
fn test_batch_uses_cache_paces_live_calls_and_captures_errors() {
    let f = fixture();
    f.guard.search("matcha", 5);
    f.backend
        .fail("sencha", BackendError::InvalidResponse("truncated".into()), 1);

    let summary = f.guard.batch_search(&["matcha", "hojicha", "sencha"]);

    assert_eq!(summary.total_queries, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.from_cache, 1);
    assert!(summary.results[0].from_cache);
    assert_eq!(summary.results[1].query_index, 1);
    assert!(summary.results[1].output.is_some());
    assert!(summary.results[2]
        .error
        .as_deref()
        .unwrap_or("")
        .contains("truncated"));

    assert_eq!(f.clock.sleeps(), vec![Duration::from_secs(2)]);
    assert_eq!(f.backend.calls_for("matcha"), 1);
}

#[test]
fn test_batch_waits_for_rate_limiter() {
    let f = fixture_with(|c| {
        c.rate_limit.max_calls = 2;
        c.batch.delay_ms = 0;
    });

    let summary = f.guard.batch_search(&["one", "two", "three"]);

    assert_eq!(summary.successful, 3);
    assert!(f.clock.sleeps().contains(&Duration::from_secs(60)));
}

#[test]
fn test_batch_entries_fail_while_breaker_is_open() {
    let f = fixture();
    f.guard
        .availability()
        .mark_unavailable(SEARCH_SERVICE, Duration::from_secs(300));

    let summary = f.guard.batch_search(&["one", "two", "three"]);

    assert_eq!(summary.successful, 0);
    assert!(summary.results.iter().all(|r| r.error.is_some()));
    assert!(f.backend.calls().is_empty());
    assert!(f.clock.sleeps().is_empty());
}

#[test]
fn test_refine_omits_timed_out_facets() {
    let f = fixture();
    f.backend.delay("tea sourcing", Duration::from_secs(2));

    let refinement = f
        .guard
        .refine("tea", &["competitor", "sourcing"], 5)
        .expect("refine");

    assert_eq!(refinement.omitted, vec!["sourcing".to_string()]);
    assert!(refinement.failed.is_empty());
    let facets: Vec<&str> = refinement.sections.iter().map(|s| s.facet.as_str()).collect();
    assert_eq!(facets, vec![BASE_FACET, "competitor"]);
    assert_eq!(
        refinement.section("competitor").expect("competitor").query,
        "tea competitor"
    );

    let again = f
        .guard
        .refine("tea", &["competitor"], 5)
        .expect("refine again");
    assert!(again.sections.iter().all(|s| s.from_cache));
    assert_eq!(f.backend.calls_for("tea competitor"), 1);
}

#[test]
fn test_refine_failure_trips_breaker() {
    let f = fixture();
    f.backend
        .fail("tea competitor", BackendError::Throttled("quota".into()), 1);

    let refinement = f.guard.refine("tea", &["competitor"], 5).expect("refine");

    assert_eq!(refinement.failed.len(), 1);
    assert_eq!(refinement.failed[0].facet, "competitor");
    assert!(refinement.section(BASE_FACET).is_some());
    assert!(!refinement.is_complete());
    assert!(!f.guard.availability().is_available(SEARCH_SERVICE));

    let blocked = f.guard.refine("coffee", &["competitor"], 5).expect("refine");
    assert!(blocked.sections.is_empty());
    assert_eq!(blocked.failed.len(), 2);
}

#[test]
fn test_refine_counts_against_search_rate_limit() {
    let f = fixture_with(|c| c.rate_limit.max_calls = 2);

    let refinement = f
        .guard
        .refine("tea", &["competitor", "sourcing", "pricing"], 5)
        .expect("refine");

    assert_eq!(f.backend.calls().len(), 2);
    let facets: Vec<&str> = refinement.sections.iter().map(|s| s.facet.as_str()).collect();
    assert_eq!(facets, vec![BASE_FACET, "competitor"]);
    let refused: Vec<&str> = refinement.failed.iter().map(|f| f.facet.as_str()).collect();
    assert_eq!(refused, vec!["sourcing", "pricing"]);
    assert!(f.guard.availability().is_available(SEARCH_SERVICE));

    let next = f.guard.search("coffee", 10);
    assert_eq!(next.origin, Origin::Fallback);
    assert_eq!(f.backend.calls().len(), 2);
}

#[test]
fn test_status_reports_known_and_extra_services() {
    let f = fixture();
    f.guard.search("green tea", 10);
    f.guard
        .read_with_fallback::<Vec<String>, _, _>("inventory", "inventory", || Err("timeout"));

    f.clock.advance(Duration::from_secs(100));
    let report = f.guard.status();

    let names: Vec<&str> = report.services.iter().map(|s| s.service.as_str()).collect();
    assert_eq!(names, vec![SEARCH_SERVICE, DATABASE_SERVICE, TREND_SERVICE, "inventory"]);

    let inventory = report.service("inventory").expect("inventory");
    assert!(!inventory.available);
    assert_eq!(inventory.cooldown_remaining_secs, Some(200));

    let database = report.service(DATABASE_SERVICE).expect("database");
    assert!(database.available);
    assert_eq!(database.last_checked_secs_ago, None);

    assert_eq!(report.cache_active_keys, 1);
    assert_eq!(report.fallback_data_dir, f.guard.fallback().store().data_dir());
}

#[test]
fn test_suppliers_refresh_snapshot_then_degrade() {
    let f = fixture();
    let filter = SupplierFilter {
        category: Some("tea".to_string()),
        limit: 1,
        ..Default::default()
    };

    let live = f.guard.suppliers(&filter, || {
        Ok::<_, String>(vec![
            supplier("Leaf & Co", "tea", "east"),
            supplier("Bean Bros", "coffee", "west"),
            supplier("Kettle", "tea", "west"),
        ])
    });
    assert_eq!(live.origin, Origin::Live);
    let live = live.data.expect("live suppliers");
    assert_eq!(live.total, 2);
    assert_eq!(live.suppliers.len(), 1);

    let degraded = f
        .guard
        .suppliers(&filter, || Err::<Vec<SupplierRecord>, _>("server closed the connection"));
    assert!(degraded.is_fallback());
    assert!(degraded.error.is_some());
    assert_eq!(degraded.data.expect("snapshot").total, 2);

    let mut fetched = false;
    let refused = f.guard.suppliers(&filter, || {
        fetched = true;
        Ok::<_, String>(Vec::new())
    });
    assert!(!fetched);
    assert!(refused.is_fallback());
}

#[test]
fn test_trend_live_then_fallback() {
    let f = fixture();

    let live = f.guard.trend("tea", 30, || {
        Ok::<_, String>(json!({"avg_growth_rate": 1.5, "max_growth_rate": 4.0}))
    });
    let live = live.data.expect("live trend");
    assert_eq!(live.avg_growth_rate, 1.5);
    assert_eq!(live.min_growth_rate, 0.0);

    let degraded = f
        .guard
        .trend("tea", 7, || Err::<serde_json::Value, _>("trend api down"));
    assert!(degraded.is_fallback());
    let degraded = degraded.data.expect("snapshot");
    assert_eq!(degraded.days, 7);
    assert_eq!(degraded.max_growth_rate, 4.0);
    assert!(!f.guard.availability().is_available(TREND_SERVICE));
}

#[test]
fn test_read_without_snapshot_reports_absence() {
    let f = fixture();

    let response = f
        .guard
        .read_with_fallback::<Vec<String>, _, _>(DATABASE_SERVICE, "categories", || {
            Err("could not connect to server")
        });

    assert!(response.is_fallback());
    assert!(response.data.is_none());
    assert_eq!(response.message.as_deref(), Some(NO_SNAPSHOT_MESSAGE));
}

#[test]
fn test_clock_is_shared_with_components() {
    let f = fixture();
    let before = f.clock.now();
    f.guard
        .availability()
        .mark_unavailable(SEARCH_SERVICE, Duration::from_secs(10));

    f.clock.advance(Duration::from_secs(10));
    assert!(f.guard.availability().is_available(SEARCH_SERVICE));
    assert_eq!(f.clock.now() - before, Duration::from_secs(10));
}
