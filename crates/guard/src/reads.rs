// crates/guard/src/reads.rs
//! Guarded reads of snapshot-backed data
//!
//! Each read goes to the live source unless the service is cooling down.
//! A successful read refreshes the snapshot; a failed one trips the breaker
//! and serves the snapshot instead.

use crate::guard::{Guard, DATABASE_SERVICE, TREND_SERVICE};
use chrono::Utc;
use rampart_core::Response;
use rampart_fallback::{SupplierFilter, SupplierList, SupplierRecord, TrendSummary};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Message attached to snapshot reads of arbitrary data types
pub const SNAPSHOT_MESSAGE: &str = "Service is unavailable, returning the last saved data.";

/// Message attached when no snapshot exists for a data type
pub const NO_SNAPSHOT_MESSAGE: &str = "Service is unavailable and no saved data exists.";

impl Guard {
    /// Reads `data_type` from `fetch`, guarded by the breaker of `service`
    ///
    /// ```no_run
    /// # use rampart_guard::Guard;
    /// # fn demo(guard: &Guard) {
    /// let response = guard.read_with_fallback("database", "categories", || {
    ///     Ok::<_, std::io::Error>(vec!["tea".to_string(), "coffee".to_string()])
    /// });
    /// if response.is_fallback() {
    ///     println!("{}", response.message.unwrap_or_default());
    /// }
    /// # }
    /// ```
    pub fn read_with_fallback<T, F, E>(&self, service: &str, data_type: &str, fetch: F) -> Response<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        if !self.availability.is_available(service) {
            return self.saved(data_type);
        }

        match fetch() {
            Ok(data) => {
                if let Err(e) = self.fallback.store().save(data_type, &data) {
                    log::warn!("Could not snapshot '{}': {}", data_type, e);
                }
                Response::live(data)
            }
            Err(e) => {
                self.trip(service, &e);
                self.saved(data_type).with_error(e)
            }
        }
    }

    /// Reads suppliers from `fetch`, guarded by the database breaker
    ///
    /// `fetch` returns the whole catalogue, which becomes the new snapshot;
    /// `filter` is applied afterwards on both the live and degraded paths.
    pub fn suppliers<F, E>(&self, filter: &SupplierFilter, fetch: F) -> Response<SupplierList>
    where
        F: FnOnce() -> Result<Vec<SupplierRecord>, E>,
        E: fmt::Display,
    {
        if !self.availability.is_available(DATABASE_SERVICE) {
            return self.fallback.suppliers(filter);
        }

        match fetch() {
            Ok(records) => {
                if let Err(e) = self.fallback.save_suppliers(&records) {
                    log::warn!("Could not snapshot suppliers: {}", e);
                }
                Response::live(filter.apply(records))
            }
            Err(e) => {
                self.trip(DATABASE_SERVICE, &e);
                self.fallback.suppliers(filter).with_error(e)
            }
        }
    }

    /// Reads trend figures for `category` from `fetch`, guarded by the trend breaker
    pub fn trend<F, E>(&self, category: &str, days: u32, fetch: F) -> Response<TrendSummary>
    where
        F: FnOnce() -> Result<Value, E>,
        E: fmt::Display,
    {
        if !self.availability.is_available(TREND_SERVICE) {
            return self.fallback.trend_data(category, days);
        }

        match fetch() {
            Ok(trend_data) => {
                let summary = TrendSummary::from_trend_data(category, days, &trend_data, Utc::now());
                if let Err(e) = self.fallback.save_trend_data(category, trend_data) {
                    log::warn!("Could not snapshot trend data for '{}': {}", category, e);
                }
                Response::live(summary)
            }
            Err(e) => {
                self.trip(TREND_SERVICE, &e);
                self.fallback.trend_data(category, days).with_error(e)
            }
        }
    }

    fn saved<T: DeserializeOwned>(&self, data_type: &str) -> Response<T> {
        match self.fallback.store().load(data_type) {
            Some(data) => Response::fallback(Some(data), SNAPSHOT_MESSAGE),
            None => Response::fallback(None, NO_SNAPSHOT_MESSAGE),
        }
    }
}
