//! File path utilities for organizing data files.
//!
//! This module provides a centralized way to manage file paths for the HTML
//! cache, per-site exports, combined results and analyzer reports.

use crate::config::Config;
use std::path::{Path, PathBuf};

/// Combined results file name
pub const COMBINED_RESULTS_FILE: &str = "all_anime_data_combined.json";

/// Scraping summary file name
pub const SUMMARY_FILE: &str = "scraping_summary.json";

/// File path manager for data files
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
    cache_dir: PathBuf,
    results_dir: PathBuf,
    analysis_report: String,
    analysis_summary_csv: String,
}

impl DataPaths {
    /// Create DataPaths from the configured directories
    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.data_dir(),
            cache_dir: config.cache_dir(),
            results_dir: config.results_dir(),
            analysis_report: config.data.analysis_report.clone(),
            analysis_summary_csv: config.data.analysis_summary_csv.clone(),
        }
    }

    // ========== Cache ==========

    /// Get HTML cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    // ========== Results ==========

    /// Get results directory
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Get per-site JSON export path
    pub fn site_json(&self, source_prefix: &str, category_set: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}_{}.json", source_prefix, category_set))
    }

    /// Get per-site CSV export path
    pub fn site_csv(&self, source_prefix: &str, category_set: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}_{}.csv", source_prefix, category_set))
    }

    /// Get combined results path
    pub fn combined_json(&self) -> PathBuf {
        self.results_dir.join(COMBINED_RESULTS_FILE)
    }

    /// Get scraping summary path
    pub fn summary_json(&self) -> PathBuf {
        self.results_dir.join(SUMMARY_FILE)
    }

    // ========== Analysis ==========

    /// Get analyzer report path
    pub fn analysis_report(&self) -> PathBuf {
        self.root.join(&self.analysis_report)
    }

    /// Get analyzer common-title CSV path
    pub fn analysis_summary_csv(&self) -> PathBuf {
        self.root.join(&self.analysis_summary_csv)
    }

    /// Create the cache and results directories
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.cache_dir, &self.results_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
