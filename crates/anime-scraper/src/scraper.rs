//! Sequential scraping driver.
//!
//! One category is resolved, fetched, extracted and merged before the next
//! begins, and one site finishes before the next starts. Failures below the
//! export stage are logged and leave an empty category or site behind.

use crate::cache::{CacheStats, HtmlCache};
use crate::error::{Result, ScrapeError};
use crate::export;
use crate::extract::{extractor_for, ListExtractor};
use crate::fetcher::Fetcher;
use crate::ranking::merge;
use crate::source::{CategoryResolver, Source};
use anyhow::Context;
use chrono::Local;
use shared::config::{SiteConfig, SitesConfig};
use shared::{AnimeRecord, CombinedResults, Config, DataPaths, ScrapeResult, ScrapingSummary};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Statistics for one site's run
#[derive(Debug, Clone, Default)]
pub struct ScraperStats {
    pub categories: usize,
    pub records: usize,
    pub failed_categories: usize,
    pub failed_queries: usize,
}

/// Options for a whole run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Records kept per category
    pub limit: usize,
    /// Only these category keys (empty = every configured category)
    pub categories: Vec<String>,
    /// Remove each site's cached pages before scraping it
    pub clear_cache: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limit: config.scraping.default_limit,
            categories: Vec::new(),
            clear_cache: false,
        }
    }
}

/// Settings for a source in the site table
pub fn site_config(sites: &SitesConfig, source: Source) -> &SiteConfig {
    match source {
        Source::MyAnimeList => &sites.myanimelist,
        Source::AniDb => &sites.anidb,
        Source::AnimePlanet => &sites.animeplanet,
    }
}

/// Sources taking part in a run: the requested ones, or every enabled site
pub fn selected_sources(config: &Config, requested: &[Source]) -> Vec<Source> {
    if !requested.is_empty() {
        let mut sources = Vec::new();
        for &source in requested {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        return sources;
    }

    Source::ALL
        .into_iter()
        .filter(|&source| site_config(&config.sites, source).enabled)
        .collect()
}

/// Scrapes every category of one source
pub struct SiteScraper {
    source: Source,
    resolver: CategoryResolver,
    fetcher: Fetcher,
    cache: HtmlCache,
    extractor: Box<dyn ListExtractor>,
    category_keys: Vec<String>,
    page_entry_limit: usize,
    delay_between_queries: Duration,
    delay_between_categories: Duration,
    stats: ScraperStats,
}

impl SiteScraper {
    /// Build a scraper for a source from the configuration
    pub fn from_config(source: Source, config: &Config) -> anyhow::Result<Self> {
        let site = site_config(&config.sites, source);
        let fetcher = Fetcher::new(
            source,
            site,
            Duration::from_secs(config.scraping.request_timeout_secs),
        )?;
        let paths = DataPaths::from_config(config);
        let cache = HtmlCache::new(paths.cache_dir(), source, config.cache.enabled)
            .context("Failed to initialize cache")?;
        let resolver = CategoryResolver::new(source);

        let configured: Vec<String> = if site.categories.is_empty() {
            resolver.keys().into_iter().map(str::to_string).collect()
        } else {
            site.categories.clone()
        };
        let category_keys = configured
            .into_iter()
            .filter(|key| !config.scraping.skip_categories.contains(key))
            .collect();

        Ok(Self {
            source,
            resolver,
            fetcher,
            cache,
            extractor: extractor_for(source),
            category_keys,
            page_entry_limit: config.scraping.page_entry_limit,
            delay_between_queries: Duration::from_millis(site.delay_between_queries_ms),
            delay_between_categories: Duration::from_millis(
                config.scraping.delay_between_categories_ms,
            ),
            stats: ScraperStats::default(),
        })
    }

    /// Keep only the given category keys, in configured order
    pub fn restrict_to(&mut self, keys: &[String]) {
        if !keys.is_empty() {
            self.category_keys.retain(|key| keys.contains(key));
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn cache(&self) -> &HtmlCache {
        &self.cache
    }

    pub fn category_keys(&self) -> &[String] {
        &self.category_keys
    }

    pub fn stats(&self) -> &ScraperStats {
        &self.stats
    }

    /// Pool every query of a category, then merge and rank the records
    pub async fn scrape_category(&mut self, key: &str, limit: usize) -> Result<Vec<AnimeRecord>> {
        let category = self.resolver.category(key)?.clone();
        let urls = self.source.query_urls(&category.query);

        info!(
            source = self.source.key(),
            category = %category.name,
            queries = urls.len(),
            "Scraping category"
        );

        let mut pooled = Vec::new();
        for (index, url) in urls.iter().enumerate() {
            match self.cache.get_or_fetch(url, &self.fetcher).await {
                Ok(document) => {
                    pooled.extend(self.extractor.extract(
                        &document,
                        &category.name,
                        self.page_entry_limit,
                    ));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping query");
                    self.stats.failed_queries += 1;
                }
            }

            if index + 1 < urls.len() && !self.delay_between_queries.is_zero() {
                sleep(self.delay_between_queries).await;
            }
        }

        Ok(merge(pooled, limit, &category.name))
    }

    /// Scrape every selected category. A failed category is kept as an empty list.
    pub async fn scrape_all(&mut self, limit: usize) -> ScrapeResult {
        let keys = self.category_keys.clone();
        let mut result = ScrapeResult::new();

        for (index, key) in keys.iter().enumerate() {
            info!(
                progress = format!("{}/{}", index + 1, keys.len()),
                source = self.source.key(),
                category = %key,
                "Processing category"
            );

            let records = match self.scrape_category(key, limit).await {
                Ok(records) => {
                    info!(category = %key, records = records.len(), "Category complete");
                    records
                }
                Err(e) => {
                    error!(category = %key, error = %e, "Failed to scrape category");
                    self.stats.failed_categories += 1;
                    Vec::new()
                }
            };

            self.stats.categories += 1;
            self.stats.records += records.len();
            result.insert(key.as_str(), records);

            if index + 1 < keys.len() && !self.delay_between_categories.is_zero() {
                sleep(self.delay_between_categories).await;
            }
        }

        info!(
            source = self.source.key(),
            categories = self.stats.categories,
            records = self.stats.records,
            failed_categories = self.stats.failed_categories,
            failed_queries = self.stats.failed_queries,
            "Site complete"
        );
        result
    }
}

/// Scrape the given sources one after another and write every export.
///
/// A site that cannot be set up contributes an empty result. Only export
/// failures are returned as errors.
pub async fn run_sources(
    config: &Config,
    sources: &[Source],
    options: &RunOptions,
) -> Result<CombinedResults> {
    let paths = DataPaths::from_config(config);
    paths.create_dirs().map_err(|e| ScrapeError::Persist {
        path: paths.results_dir().to_path_buf(),
        source: e.into(),
    })?;

    let delay_between_sites = Duration::from_millis(config.scraping.delay_between_sites_ms);
    let category_set = &config.scraping.category_set;
    let mut combined = CombinedResults::new();

    for (index, &source) in sources.iter().enumerate() {
        info!(
            progress = format!("{}/{}", index + 1, sources.len()),
            source = %source,
            "Starting site"
        );

        let result = match prepare_site(source, config, options) {
            Ok(mut scraper) => {
                let result = scraper.scrape_all(options.limit).await;
                export::write_site(
                    &result,
                    &paths.site_json(source.file_prefix(), category_set),
                    &paths.site_csv(source.file_prefix(), category_set),
                )?;
                result
            }
            Err(e) => {
                error!(source = %source, error = %e, "Site failed");
                ScrapeResult::new()
            }
        };
        combined.insert(source.key(), result);

        if index + 1 < sources.len() && !delay_between_sites.is_zero() {
            info!(delay_ms = delay_between_sites.as_millis(), "Waiting before next site");
            sleep(delay_between_sites).await;
        }
    }

    export::write_combined(&combined, &paths.combined_json())?;
    export::write_summary(
        &ScrapingSummary::from_results(&combined, Local::now()),
        &paths.summary_json(),
    )?;

    Ok(combined)
}

fn prepare_site(source: Source, config: &Config, options: &RunOptions) -> anyhow::Result<SiteScraper> {
    let mut scraper = SiteScraper::from_config(source, config)?;
    scraper.restrict_to(&options.categories);

    if options.clear_cache {
        scraper.cache().clear().context("Failed to clear cache")?;
    }

    let CacheStats {
        total_files,
        total_size_bytes,
    } = scraper.cache().stats().context("Failed to get cache stats")?;
    info!(
        source = source.key(),
        cached_files = total_files,
        cache_size_kb = total_size_bytes / 1_000,
        categories = scraper.category_keys().len(),
        "Cache statistics"
    );

    Ok(scraper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.data.root_dir = root.to_string_lossy().to_string();
        config.scraping.delay_between_categories_ms = 0;
        config.scraping.delay_between_sites_ms = 0;
        for source in Source::ALL {
            let site = match source {
                Source::MyAnimeList => &mut config.sites.myanimelist,
                Source::AniDb => &mut config.sites.anidb,
                Source::AnimePlanet => &mut config.sites.animeplanet,
            };
            site.pre_request_delay_ms = 0;
            site.delay_between_queries_ms = 0;
        }
        config
    }

    /// AniDB tag search with 25 rows, three of them repeating earlier titles
    fn anidb_page() -> String {
        let mut rows = String::new();
        for i in 0..22 {
            rows.push_str(&format!(
                "<tr><td class=\"name\"><a href=\"/anime/{id}\">Romance Show {i}</a></td>\
                 <td class=\"type\">TV Series</td><td class=\"eps\">12</td>\
                 <td class=\"rating\">{score:.2} (100)</td></tr>\n",
                id = 1000 + i,
                i = i,
                score = 5.0 + i as f64 * 0.2,
            ));
        }
        for (i, score) in [(3, "9.90"), (10, "1.00"), (21, "2.00")] {
            rows.push_str(&format!(
                "<tr><td class=\"name\"><a href=\"/anime/{id}\">ROMANCE SHOW {i}!</a></td>\
                 <td class=\"rating\">{score} (5)</td></tr>\n",
                id = 5000 + i,
                i = i,
                score = score,
            ));
        }
        format!(
            "<html><body><table id=\"animelist\"><tbody>\n{}</tbody></table></body></html>",
            rows
        )
    }

    fn seed_cache(config: &Config, source: Source, url: &str, body: &str) -> Result<()> {
        let cache = HtmlCache::new(config.cache_dir(), source, true)?;
        cache.set(url, body)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_category_end_to_end_from_cache() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = test_config(temp_dir.path());
        let url = CategoryResolver::new(Source::AniDb).urls_for("romance")?.remove(0);
        seed_cache(&config, Source::AniDb, &url, &anidb_page())?;

        let options = RunOptions {
            limit: 20,
            categories: vec!["romance".to_string()],
            clear_cache: false,
        };
        let combined = run_sources(&config, &[Source::AniDb], &options).await?;

        let records = combined.get("anidb").unwrap().get("romance").unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(
            records.iter().map(|r| r.rank).collect::<Vec<_>>(),
            (1..=20).collect::<Vec<u32>>()
        );
        assert_eq!(records[0].title, "ROMANCE SHOW 3!");
        assert_eq!(records[0].score, "9.90");
        assert!(records.iter().all(|r| r.category == "Romance"));

        // Per-site, combined and summary files
        let paths = DataPaths::from_config(&config);
        let site: ScrapeResult =
            serde_json::from_str(&fs::read_to_string(paths.site_json("anidb", "top_anime"))?)?;
        assert_eq!(site.keys().collect::<Vec<_>>(), vec!["romance"]);
        assert!(paths.site_csv("anidb", "top_anime").exists());
        assert!(paths.combined_json().exists());

        let summary: ScrapingSummary =
            serde_json::from_str(&fs::read_to_string(paths.summary_json())?)?;
        assert_eq!(summary.total_sources, 1);
        assert_eq!(summary.sources.get("anidb").unwrap().total_anime_entries, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_category_becomes_empty_list() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut config = test_config(temp_dir.path());
        config.sites.anidb.categories = vec!["slice_of_life".to_string(), "romance".to_string()];
        let url = CategoryResolver::new(Source::AniDb).urls_for("romance")?.remove(0);
        seed_cache(&config, Source::AniDb, &url, &anidb_page())?;

        let mut scraper = SiteScraper::from_config(Source::AniDb, &config)?;
        let result = scraper.scrape_all(5).await;

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["slice_of_life", "romance"]);
        assert!(result.get("slice_of_life").unwrap().is_empty());
        assert_eq!(result.get("romance").unwrap().len(), 5);
        assert_eq!(scraper.stats().failed_categories, 1);
        assert_eq!(scraper.stats().records, 5);
        Ok(())
    }

    #[test]
    fn test_category_selection() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut config = test_config(temp_dir.path());
        config.scraping.skip_categories = vec!["ecchi".to_string()];

        let mut scraper = SiteScraper::from_config(Source::AnimePlanet, &config)?;
        assert!(!scraper.category_keys().iter().any(|k| k == "ecchi"));
        assert_eq!(scraper.category_keys()[0], "action_adventure_shounen");

        scraper.restrict_to(&["comedy".to_string(), "romance".to_string()]);
        assert_eq!(scraper.category_keys(), ["romance", "comedy"]);
        Ok(())
    }

    #[test]
    fn test_selected_sources() {
        let mut config = Config::default();
        config.sites.anidb.enabled = false;
        assert_eq!(
            selected_sources(&config, &[]),
            vec![Source::MyAnimeList, Source::AnimePlanet]
        );
        assert_eq!(
            selected_sources(&config, &[Source::AniDb, Source::AniDb]),
            vec![Source::AniDb]
        );
    }
}
