//! Error taxonomy for the scraping pipeline.
//!
//! Only [`ScrapeError::Persist`] is allowed to end a run; every other variant
//! is logged and the affected entry, query or category is skipped.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport failure or a non-200 status, after retries
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("category '{key}' is not defined for {source_name}")]
    CategoryNotFound { source_name: String, key: String },

    /// A listing container or entry did not have the expected shape
    #[error("extraction mismatch: {0}")]
    ExtractionMismatch(String),

    #[error("failed to write cache file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
