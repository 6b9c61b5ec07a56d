//! Configuration management for the anime list scrapers.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Scraping run settings shared by every site
    pub scraping: ScrapingConfig,

    /// HTML cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-site settings
    #[serde(default)]
    pub sites: SitesConfig,

    /// Analyzer settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,

    /// Cache directory (relative to data directory or absolute)
    pub cache_dir: String,

    /// Results directory (relative to data directory or absolute)
    pub results_dir: String,

    /// Analyzer report file name (written under the data directory)
    pub analysis_report: String,

    /// Analyzer common-title CSV file name (written under the data directory)
    pub analysis_summary_csv: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Scraping run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Records kept per category after merging
    pub default_limit: usize,

    /// Listing entries read from a single fetched page
    pub page_entry_limit: usize,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Delay after each category in milliseconds
    pub delay_between_categories_ms: u64,

    /// Delay between two sites in milliseconds
    pub delay_between_sites_ms: u64,

    /// Category keys never scraped, whatever the site
    #[serde(default)]
    pub skip_categories: Vec<String>,

    /// Label used in per-site output file names
    pub category_set: String,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching. Entries never expire once written.
    pub enabled: bool,
}

/// Settings for every supported site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    pub myanimelist: SiteConfig,
    pub anidb: SiteConfig,
    pub animeplanet: SiteConfig,
}

/// Settings for a single site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Whether the site takes part in a run
    pub enabled: bool,

    /// Courtesy delay before each network request in milliseconds
    pub pre_request_delay_ms: u64,

    /// Delay after each query URL of a category in milliseconds
    pub delay_between_queries_ms: u64,

    /// Category keys to scrape (empty = every built-in category)
    #[serde(default)]
    pub categories: Vec<String>,

    /// Retry policy for this site's fetcher
    pub retry: RetryConfig,
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per URL (1 = no retry)
    pub max_attempts: u32,

    /// Base wait after a blocking status; multiplied by the attempt number
    pub block_backoff_ms: u64,

    /// Wait after a transport-level error
    pub transport_delay_ms: u64,

    /// Status codes that are retried with backoff
    pub retry_statuses: Vec<u16>,
}

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Common titles kept in the report
    pub top_common: usize,

    /// Title words kept in the report
    pub top_words: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            block_backoff_ms: 5000,
            transport_delay_ms: 5000,
            retry_statuses: vec![403],
        }
    }
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            myanimelist: SiteConfig {
                enabled: true,
                pre_request_delay_ms: 0,
                delay_between_queries_ms: 1000,
                categories: Vec::new(),
                retry: RetryConfig::default(),
            },
            anidb: SiteConfig {
                enabled: true,
                pre_request_delay_ms: 2000,
                delay_between_queries_ms: 0,
                categories: Vec::new(),
                retry: RetryConfig::default(),
            },
            animeplanet: SiteConfig {
                enabled: true,
                pre_request_delay_ms: 2000,
                delay_between_queries_ms: 0,
                categories: Vec::new(),
                retry: RetryConfig {
                    max_attempts: 3,
                    ..RetryConfig::default()
                },
            },
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_common: 50,
            top_words: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: ".".to_string(),
                cache_dir: "html_cache".to_string(),
                results_dir: "results".to_string(),
                analysis_report: "anime_analysis_report.json".to_string(),
                analysis_summary_csv: "anime_analysis_summary.csv".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            scraping: ScrapingConfig {
                default_limit: 20,
                page_entry_limit: 50,
                request_timeout_secs: 30,
                delay_between_categories_ms: 2000,
                delay_between_sites_ms: 5000,
                skip_categories: Vec::new(),
                category_set: "top_anime".to_string(),
            },
            cache: CacheConfig::default(),
            sites: SitesConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.under_data_dir(&self.logging.log_dir)
    }

    /// Get the path for the HTML cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.under_data_dir(&self.data.cache_dir)
    }

    /// Get the path for the results directory
    pub fn results_dir(&self) -> PathBuf {
        self.under_data_dir(&self.data.results_dir)
    }

    /// Parse the configured default log level, falling back to INFO
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }

    fn under_data_dir(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}
