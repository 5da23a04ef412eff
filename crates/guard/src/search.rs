// crates/guard/src/search.rs
//! Cached, rate-limited web search with snapshot fallback
//!
//! Order of checks for one search:
//! 1. a fresh cache entry is returned as `cached`
//! 2. an open breaker short-circuits to the last saved snapshot
//! 3. a refused rate limit does the same, without tripping the breaker
//! 4. otherwise the backend is called once; success is cached and
//!    snapshotted, failure trips the breaker and falls back
//!
//! Failed searches are not retried inline. The breaker keeps further calls
//! away from the service for the cooldown instead.

use crate::backend::{SearchOutput, SearchRequest, SearchResult};
use crate::error::BackendError;
use crate::guard::{Guard, SEARCH_SERVICE};
use rampart_core::Response;
use rampart_fallback::FallbackSearch;
use rampart_resilience::CacheKey;

/// Message attached to search results served from the cache
pub const FROM_CACHE_MESSAGE: &str =
    "Returned from cache; the search service may be throttled, so the request was not repeated.";

/// Cache key of a search, shared by single, batch and refinement searches
pub fn search_cache_key(query: &str, count: usize) -> String {
    CacheKey::new("web_search")
        .param("query", query)
        .param("count", count)
        .build()
}

impl Guard {
    /// Searches the web for `query`, degrading to cached or saved results
    ///
    /// Never fails: every refusal or error is folded into a fallback
    /// response whose `error` field carries the cause.
    pub fn search(&self, query: &str, count: usize) -> Response<SearchOutput> {
        let key = search_cache_key(query, count);
        if let Some(output) = self.cache.get(&key) {
            log::debug!("Serving '{}' from cache", query);
            return Response::cached(output).with_message(FROM_CACHE_MESSAGE);
        }

        if !self.availability.is_available(SEARCH_SERVICE) {
            log::info!("Search service cooling down, using fallback for '{}'", query);
            return self.fallback_search(query);
        }

        if let Err(e) = self.limiters.for_service(SEARCH_SERVICE).try_acquire() {
            log::warn!("Search for '{}' refused: {}", query, e);
            return self.fallback_search(query).with_error(e);
        }

        match self.fetch(&SearchRequest::new(query, count)) {
            Ok(output) => {
                self.remember(&key, &output);
                Response::live(output)
            }
            Err(e) => {
                self.trip(SEARCH_SERVICE, &e);
                self.fallback_search(query).with_error(e)
            }
        }
    }

    pub(crate) fn fetch(&self, request: &SearchRequest) -> Result<SearchOutput, BackendError> {
        let response = self.backend.web_search(request)?;
        Ok(SearchOutput::from_response(request.query.clone(), response))
    }

    /// Caches a live result and saves it as the platform snapshot
    ///
    /// A snapshot that cannot be written is logged and otherwise ignored.
    pub(crate) fn remember(&self, key: &str, output: &SearchOutput) {
        self.cache
            .set(key, output.clone(), self.settings.search_ttl);

        let results: Vec<serde_json::Value> = output
            .results
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        if let Err(e) =
            self.fallback
                .save_search_results(&output.query, &self.settings.platform, &results)
        {
            log::warn!("Could not snapshot results for '{}': {}", output.query, e);
        }
    }

    /// Last saved results for the configured platform, shaped as a search output
    pub(crate) fn fallback_search(&self, query: &str) -> Response<SearchOutput> {
        self.fallback
            .search_results(query, &self.settings.platform)
            .map(|saved| output_from_snapshot(query, saved))
    }
}

fn output_from_snapshot(query: &str, saved: FallbackSearch) -> SearchOutput {
    let results: Vec<SearchResult> = saved
        .results
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    SearchOutput {
        query: query.to_string(),
        total_results: results.len(),
        ai_summary: String::new(),
        results,
    }
}
