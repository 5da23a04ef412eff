// crates/fallback/src/lib.rs
//! Durable fallback snapshots for degraded reads
//!
//! When a live dependency is refused (breaker open, rate limit hit, call
//! failed), callers substitute the last payload that was fetched
//! successfully. [`SnapshotStore`] keeps one JSON file per data type and
//! survives restarts; [`FallbackService`] builds the degraded responses on
//! top of it.
//!
//! # Example
//!
//! ```no_run
//! use rampart_fallback::{FallbackService, SnapshotStore};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), rampart_fallback::FallbackError> {
//! let service = FallbackService::new(SnapshotStore::open("fallback_data")?);
//! service.save_search_results("green tea", "general", &[json!({"title": "Tea Co"})])?;
//!
//! let response = service.search_results("green tea", "general");
//! assert!(response.is_fallback());
//! # Ok(())
//! # }
//! ```

mod degraded;
mod error;
mod store;

pub use degraded::{
    FallbackSearch, FallbackService, SearchSnapshot, SupplierFilter, SupplierList,
    SupplierRecord, TrendSnapshot, TrendSummary, DEFAULT_MAX_SAVED_RESULTS, DEFAULT_PLATFORM,
    SUPPLIERS_DATA_TYPE,
};
pub use error::{FallbackError, FallbackResult};
pub use store::{Snapshot, SnapshotInfo, SnapshotStore};
