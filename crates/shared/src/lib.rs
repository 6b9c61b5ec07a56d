//! Shared library for the anime list scrapers and analyzer.
//!
//! This crate provides common functionality used across all binary crates:
//! - Configuration management
//! - Logging infrastructure
//! - Data models (records, categories, ordered result maps)
//! - File path utilities
//! - Title and score text helpers

pub mod config;
pub mod logging;
pub mod models;
pub mod paths;
pub mod text;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;
pub use paths::DataPaths;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
