// crates/guard/src/refine.rs
//! Parallel refinement of a base query
//!
//! A refinement runs the base query plus one sub-query per facet (for
//! example `competitor` or `sourcing`) at the same time on the parallel
//! executor. Sub-queries that miss their timeout are dropped from the
//! result and listed as omitted; the rest are returned as they finished.
//! Every live sub-query counts against the `search` rate limit, and one the
//! limiter refuses is reported as failed without reaching the backend.

use crate::backend::{SearchOutput, SearchRequest};
use crate::error::GuardResult;
use crate::guard::{Guard, SEARCH_SERVICE};
use crate::search::search_cache_key;
use rampart_resilience::ParallelTask;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Facet name under which the unrefined query is reported
pub const BASE_FACET: &str = "base";

/// Results of one facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedSection {
    pub facet: String,
    /// Query actually sent for this facet
    pub query: String,
    pub output: SearchOutput,
    pub from_cache: bool,
}

/// A facet that produced no results, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFacet {
    pub facet: String,
    pub error: String,
}

/// Aggregate of a parallel refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub query: String,
    /// Sections in facet order, base first
    pub sections: Vec<RefinedSection>,
    /// Facets abandoned on timeout
    pub omitted: Vec<String>,
    pub failed: Vec<FailedFacet>,
}

impl Refinement {
    pub fn section(&self, facet: &str) -> Option<&RefinedSection> {
        self.sections.iter().find(|s| s.facet == facet)
    }

    /// True when every facet produced results
    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty() && self.failed.is_empty()
    }
}

/// Builds the sub-query of a facet
pub fn facet_query(query: &str, facet: &str) -> String {
    if facet == BASE_FACET {
        query.to_string()
    } else {
        format!("{} {}", query, facet)
    }
}

impl Guard {
    /// Searches `query` and each `facets` refinement of it concurrently
    ///
    /// Only an unusable worker pool is an error; timeouts, backend failures,
    /// rate-limit refusals and an open breaker are reported per facet. Only a
    /// backend failure trips the breaker.
    pub fn refine<S: AsRef<str>>(
        &self,
        query: &str,
        facets: &[S],
        count: usize,
    ) -> GuardResult<Refinement> {
        let facet_names: Vec<&str> = std::iter::once(BASE_FACET)
            .chain(facets.iter().map(|f| f.as_ref()))
            .collect();

        let mut sections = Vec::with_capacity(facet_names.len());
        let mut failed = Vec::new();
        let mut tasks = Vec::new();
        let breaker_open = !self.availability.is_available(SEARCH_SERVICE);
        let limiter = self.limiters.for_service(SEARCH_SERVICE);

        for facet in &facet_names {
            let sub_query = facet_query(query, facet);
            if let Some(output) = self.cache.get(&search_cache_key(&sub_query, count)) {
                sections.push(RefinedSection {
                    facet: facet.to_string(),
                    query: sub_query,
                    output,
                    from_cache: true,
                });
                continue;
            }

            if breaker_open {
                failed.push(FailedFacet {
                    facet: facet.to_string(),
                    error: format!("Service '{}' is cooling down", SEARCH_SERVICE),
                });
                continue;
            }

            if let Err(e) = limiter.try_acquire() {
                log::debug!("Refinement facet '{}' refused: {}", facet, e);
                failed.push(FailedFacet {
                    facet: facet.to_string(),
                    error: e.to_string(),
                });
                continue;
            }

            let backend = Arc::clone(&self.backend);
            let request = SearchRequest::new(sub_query, count);
            tasks.push(ParallelTask::new(*facet, move || {
                backend
                    .web_search(&request)
                    .map(|response| SearchOutput::from_response(request.query.clone(), response))
            }));
        }

        let results = self.executor.run(tasks)?;

        let omitted: Vec<String> = results.abandoned().into_iter().map(String::from).collect();
        let backend_failures: Vec<FailedFacet> = results
            .failed()
            .into_iter()
            .map(|(facet, error)| FailedFacet {
                facet: facet.to_string(),
                error: error.to_string(),
            })
            .collect();
        if let Some(first) = backend_failures.first() {
            self.trip(SEARCH_SERVICE, &first.error);
        }
        failed.extend(backend_failures);

        for (facet, output) in results.into_completed() {
            self.cache.set(
                search_cache_key(&output.query, count),
                output.clone(),
                self.settings.search_ttl,
            );
            sections.push(RefinedSection {
                query: output.query.clone(),
                facet,
                output,
                from_cache: false,
            });
        }

        sections.sort_by_key(|s| facet_names.iter().position(|f| *f == s.facet));
        if !omitted.is_empty() {
            log::warn!("Refinement of '{}' omitted {:?}", query, omitted);
        }

        Ok(Refinement {
            query: query.to_string(),
            sections,
            omitted,
            failed,
        })
    }
}
