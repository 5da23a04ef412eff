// crates/guard/src/batch.rs
//! Paced batch search

use crate::backend::{SearchOutput, SearchRequest};
use crate::guard::{Guard, SEARCH_SERVICE};
use crate::search::search_cache_key;
use serde::{Deserialize, Serialize};

/// Outcome of one query in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub query: String,
    /// Position of the query in the submitted list
    pub query_index: usize,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<SearchOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate of a batch search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_queries: usize,
    pub successful: usize,
    pub from_cache: usize,
    pub results: Vec<BatchEntry>,
}

impl Guard {
    /// Runs `queries` one after another, sparing the search service
    ///
    /// Cached queries are answered immediately. Every other query waits for
    /// the search rate limiter, and live calls after the first are spaced by
    /// the configured batch delay. While the search breaker is open, uncached
    /// queries fail at once without pacing. A failing query becomes an entry
    /// with an error; it never aborts the batch.
    pub fn batch_search<S: AsRef<str>>(&self, queries: &[S]) -> BatchSummary {
        let count = self.settings.batch_result_count;
        let limiter = self.limiters.for_service(SEARCH_SERVICE);
        let mut live_calls = 0usize;
        let mut results = Vec::with_capacity(queries.len());

        for (query_index, query) in queries.iter().enumerate() {
            let query = query.as_ref();
            let key = search_cache_key(query, count);

            if let Some(output) = self.cache.get(&key) {
                results.push(BatchEntry {
                    query: query.to_string(),
                    query_index,
                    from_cache: true,
                    output: Some(output),
                    error: None,
                });
                continue;
            }

            let outcome = self
                .availability
                .check(SEARCH_SERVICE)
                .and_then(|()| {
                    if live_calls > 0 {
                        self.clock.sleep(self.settings.batch_delay);
                    }
                    live_calls += 1;
                    limiter.acquire_blocking()
                })
                .map(|waited| {
                    if !waited.is_zero() {
                        log::debug!("Batch query {} waited {:?} for the rate limit", query_index, waited);
                    }
                })
                .map_err(|e| e.to_string())
                .and_then(|()| {
                    self.fetch(&SearchRequest::new(query, count))
                        .map_err(|e| {
                            self.trip(SEARCH_SERVICE, &e);
                            e.to_string()
                        })
                });

            let entry = match outcome {
                Ok(output) => {
                    self.cache
                        .set(key, output.clone(), self.settings.search_ttl);
                    BatchEntry {
                        query: query.to_string(),
                        query_index,
                        from_cache: false,
                        output: Some(output),
                        error: None,
                    }
                }
                Err(error) => {
                    log::warn!("Batch query {} ('{}') failed: {}", query_index, query, error);
                    BatchEntry {
                        query: query.to_string(),
                        query_index,
                        from_cache: false,
                        output: None,
                        error: Some(error),
                    }
                }
            };
            results.push(entry);
        }

        let summary = BatchSummary {
            total_queries: queries.len(),
            successful: results.iter().filter(|r| r.is_success()).count(),
            from_cache: results.iter().filter(|r| r.from_cache).count(),
            results,
        };
        log::info!(
            "Batch of {} queries: {} successful, {} from cache",
            summary.total_queries,
            summary.successful,
            summary.from_cache
        );
        summary
    }
}
