//! Anime list scraper library.
//!
//! Collects ranked anime lists from MyAnimeList, AniDB and AnimePlanet:
//! resolves categories to listing URLs, fetches them through a permanent
//! HTML cache, extracts records per site, merges and ranks them, and exports
//! the results as JSON and CSV.

pub mod cache;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetcher;
pub mod ranking;
pub mod scraper;
pub mod source;

pub use cache::{CacheStats, HtmlCache};
pub use error::{Result, ScrapeError};
pub use extract::{extractor_for, ListExtractor};
pub use fetcher::{Fetcher, RetryPolicy};
pub use ranking::merge;
pub use scraper::{run_sources, selected_sources, RunOptions, ScraperStats, SiteScraper};
pub use source::{CategoryResolver, Source};
