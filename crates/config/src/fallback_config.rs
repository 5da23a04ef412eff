// crates/config/src/fallback_config.rs
//! Fallback snapshot store configuration section

use crate::validation::{ConfigSection, Report};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where snapshots live and how much of each is kept
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    /// Directory holding one JSON file per data type
    pub data_dir: PathBuf,

    /// Most search results kept per snapshot
    pub max_saved_results: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("fallback_data"),
            max_saved_results: 20,
        }
    }
}

impl ConfigSection for FallbackConfig {
    const NAME: &'static str = "fallback";

    fn check(&self, report: &mut Report) {
        report
            .filled("data_dir", &self.data_dir.to_string_lossy())
            .within("max_saved_results", self.max_saved_results, 1..=1000);
    }
}
