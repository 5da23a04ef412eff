// crates/guard/src/lib.rs
//! Degradation layer in front of a web search backend and other reads
//!
//! A [`Guard`] combines the resilience components into the calls an
//! application actually makes:
//! - [`Guard::search`]: cache, breaker, rate limit, snapshot fallback
//! - [`Guard::batch_search`]: paced sequential searches
//! - [`Guard::refine`]: a query and its refinements searched in parallel
//! - [`Guard::read_with_fallback`], [`Guard::suppliers`], [`Guard::trend`]:
//!   snapshot-backed reads of other services
//! - [`Guard::status`]: per-service availability and cache occupancy
//!
//! Every read returns a [`Response`] whose origin says whether the data is
//! live, cached or a fallback.
//!
//! # Example
//!
//! ```no_run
//! use rampart_config::Config;
//! use rampart_guard::{BackendError, Guard, SearchBackend, SearchRequest, SearchResponse};
//! use std::sync::Arc;
//!
//! struct Offline;
//!
//! impl SearchBackend for Offline {
//!     fn web_search(&self, _: &SearchRequest) -> Result<SearchResponse, BackendError> {
//!         Err(BackendError::Unavailable("no network".into()))
//!     }
//! }
//!
//! # fn main() -> Result<(), rampart_guard::GuardError> {
//! let guard = Guard::from_config(&Config::default(), Arc::new(Offline))?;
//! let response = guard.search("green tea", 10);
//! assert!(response.is_fallback());
//! # Ok(())
//! # }
//! ```

mod backend;
mod batch;
mod error;
mod guard;
mod reads;
mod refine;
mod search;
mod status;

pub use backend::{SearchBackend, SearchOutput, SearchRequest, SearchResponse, SearchResult, WebItem};
pub use batch::{BatchEntry, BatchSummary};
pub use error::{BackendError, GuardError, GuardResult};
pub use guard::{
    Guard, GuardSettings, DATABASE_SERVICE, KNOWN_SERVICES, SEARCH_SERVICE, TREND_SERVICE,
};
pub use reads::{NO_SNAPSHOT_MESSAGE, SNAPSHOT_MESSAGE};
pub use refine::{facet_query, FailedFacet, RefinedSection, Refinement, BASE_FACET};
pub use search::{search_cache_key, FROM_CACHE_MESSAGE};
pub use status::{ServiceReport, StatusReport};

pub use rampart_core::{Origin, Response};
