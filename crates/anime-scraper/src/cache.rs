//! Permanent on-disk cache of fetched listing pages.
//!
//! One HTML file per URL, named from the URL's path and query. A present file
//! is returned as-is; entries never expire and must be deleted by hand.

use crate::error::{Result, ScrapeError};
use crate::fetcher::Fetcher;
use crate::source::Source;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid regex"));

/// Cache of raw HTML for one source
pub struct HtmlCache {
    /// Root cache directory
    cache_dir: PathBuf,
    /// Source whose base URL is stripped and whose prefix names the files
    source: Source,
    /// Whether caching is enabled
    enabled: bool,
}

impl HtmlCache {
    /// Create a new cache for a source
    pub fn new(cache_dir: impl AsRef<Path>, source: Source, enabled: bool) -> anyhow::Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        if enabled {
            std::fs::create_dir_all(&cache_dir)
                .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
            debug!(cache_dir = %cache_dir.display(), source = source.key(), "Cache initialized");
        }

        Ok(Self {
            cache_dir,
            source,
            enabled,
        })
    }

    /// Deterministic file-name key for a URL: path and query with every run
    /// of non-alphanumeric characters collapsed to one underscore.
    pub fn cache_key(&self, url: &str) -> String {
        let relative = match url.strip_prefix(self.source.base_url()) {
            Some(rest) => rest.to_string(),
            None => match Url::parse(url) {
                Ok(parsed) => {
                    let mut rest = parsed.path().to_string();
                    if let Some(query) = parsed.query() {
                        rest.push('?');
                        rest.push_str(query);
                    }
                    rest
                }
                Err(_) => url.to_string(),
            },
        };

        let key = NON_ALPHANUMERIC.replace_all(&relative, "_");
        let key = key.trim_matches('_');
        if key.is_empty() {
            "main".to_string()
        } else {
            key.to_string()
        }
    }

    /// Get the cache file path for a URL
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!(
            "{}_{}.html",
            self.source.file_prefix(),
            self.cache_key(url)
        ))
    }

    /// Get a cached page if it exists
    pub fn get(&self, url: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let path = self.cache_path(url);
        if !path.exists() {
            debug!(url = %url, "Cache miss");
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                info!(path = %path.display(), "Loading from cache");
                Some(content)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                None
            }
        }
    }

    /// Store a page. Written to a temp file first, then renamed into place.
    pub fn set(&self, url: &str, body: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.cache_path(url);
        let tmp_path = path.with_extension("html.tmp");

        std::fs::write(&tmp_path, body)
            .and_then(|_| std::fs::rename(&tmp_path, &path))
            .map_err(|source| {
                let _ = std::fs::remove_file(&tmp_path);
                ScrapeError::CacheWrite {
                    path: path.clone(),
                    source,
                }
            })?;

        debug!(url = %url, path = %path.display(), "Cache stored");
        Ok(())
    }

    /// Check if a cache entry exists
    pub fn exists(&self, url: &str) -> bool {
        self.enabled && self.cache_path(url).exists()
    }

    /// Return the cached page, or fetch it and store it.
    ///
    /// A failed cache write is logged and does not affect the returned page.
    pub async fn get_or_fetch(&self, url: &str, fetcher: &Fetcher) -> Result<String> {
        if let Some(cached) = self.get(url) {
            return Ok(cached);
        }

        let body = fetcher
            .fetch(url, fetcher.timeout())
            .await
            .ok_or_else(|| ScrapeError::Fetch {
                url: url.to_string(),
                reason: "no document".to_string(),
            })?;

        if let Err(e) = self.set(url, &body) {
            warn!(error = %e, "Error saving to cache");
        } else if self.enabled {
            info!(path = %self.cache_path(url).display(), "HTML cached");
        }

        Ok(body)
    }

    /// Remove every cached page of this source
    pub fn clear(&self) -> anyhow::Result<()> {
        if !self.enabled || !self.cache_dir.exists() {
            return Ok(());
        }

        let mut removed = 0;
        for path in self.cached_pages()? {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", path.display()))?;
            removed += 1;
        }

        info!(source = self.source.key(), removed = removed, "Cache cleared");
        Ok(())
    }

    /// Get cache statistics for this source
    pub fn stats(&self) -> anyhow::Result<CacheStats> {
        if !self.enabled || !self.cache_dir.exists() {
            return Ok(CacheStats {
                total_files: 0,
                total_size_bytes: 0,
            });
        }

        let mut total_files = 0;
        let mut total_size_bytes = 0;
        for path in self.cached_pages()? {
            total_files += 1;
            total_size_bytes += std::fs::metadata(&path)?.len();
        }

        Ok(CacheStats {
            total_files,
            total_size_bytes,
        })
    }

    /// This source's `.html` files; temp files from an interrupted write are skipped
    fn cached_pages(&self) -> anyhow::Result<Vec<PathBuf>> {
        let prefix = format!("{}_", self.source.file_prefix());
        let mut pages = Vec::new();

        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let owned = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix))
                .unwrap_or(false);
            let is_page = path.extension().and_then(|e| e.to_str()) == Some("html");
            if owned && is_page && path.is_file() {
                pages.push(path);
            }
        }

        Ok(pages)
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
}
