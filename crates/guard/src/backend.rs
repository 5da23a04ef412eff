// crates/guard/src/backend.rs
//! Search backend seam and response schema
//!
//! The remote search service is reached through [`SearchBackend`]. Its
//! answer is decoded once into [`SearchResponse`], where every optional
//! field has a default, and normalised into [`SearchOutput`] before anything
//! downstream sees it.

use crate::error::BackendError;
use serde::{Deserialize, Serialize};

/// Parameters of one web search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub count: usize,
    pub need_summary: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, count: usize) -> Self {
        Self {
            query: query.into(),
            count,
            need_summary: true,
        }
    }

    pub fn with_summary(mut self, need_summary: bool) -> Self {
        self.need_summary = need_summary;
        self
    }
}

/// A remote web search service
///
/// Implementations perform one blocking call and report failures as
/// [`BackendError`]; they never retry on their own.
pub trait SearchBackend: Send + Sync {
    fn web_search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;
}

/// Raw response of the search service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// AI summary of the results, when requested and available
    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub web_items: Vec<WebItem>,
}

impl SearchResponse {
    /// Decodes a JSON response body
    pub fn from_json(body: &str) -> Result<Self, BackendError> {
        serde_json::from_str(body).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

/// One web result as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

/// One normalised search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub site_name: String,
    pub summary: String,
    pub publish_time: String,
}

impl From<WebItem> for SearchResult {
    fn from(item: WebItem) -> Self {
        Self {
            title: item.title,
            url: item.url,
            snippet: item.snippet,
            site_name: item.site_name,
            summary: item.summary.unwrap_or_default(),
            publish_time: item.publish_time.unwrap_or_default(),
        }
    }
}

/// Normalised search results handed to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutput {
    pub query: String,
    pub total_results: usize,
    pub ai_summary: String,
    pub results: Vec<SearchResult>,
}

impl SearchOutput {
    pub fn from_response(query: impl Into<String>, response: SearchResponse) -> Self {
        let results: Vec<SearchResult> = response
            .web_items
            .into_iter()
            .map(SearchResult::from)
            .collect();
        Self {
            query: query.into(),
            total_results: results.len(),
            ai_summary: response.summary.unwrap_or_default(),
            results,
        }
    }
}
