//! Supported sites and their category tables.
//!
//! Each [`Source`] knows its base URL, request headers and built-in
//! categories; [`CategoryResolver`] turns a category key into the query URLs
//! that have to be fetched for it.

use crate::error::{Result, ScrapeError};
use shared::{Category, CategoryQuery};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// AniDB listing ordering: rating descending, then name ascending
const ANIDB_LISTING_QUERY: &str = "h=1&noalias=1&orderby.name=1.1&orderby.rating=0.2";

/// A site that publishes ranked anime lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    MyAnimeList,
    AniDb,
    AnimePlanet,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::MyAnimeList, Source::AniDb, Source::AnimePlanet];

    /// Key used in the combined results and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Source::MyAnimeList => "myanimelist",
            Source::AniDb => "anidb",
            Source::AnimePlanet => "animeplanet",
        }
    }

    /// Prefix for cache files and per-site result files
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Source::MyAnimeList => "mal",
            Source::AniDb => "anidb",
            Source::AnimePlanet => "animeplanet",
        }
    }

    /// Name written into each record's `source` field
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::MyAnimeList => "MyAnimeList",
            Source::AniDb => "AniDB",
            Source::AnimePlanet => "AnimePlanet",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Source::MyAnimeList => "https://myanimelist.net",
            Source::AniDb => "https://anidb.net",
            Source::AnimePlanet => "https://www.anime-planet.com",
        }
    }

    pub fn user_agent(&self) -> &'static str {
        match self {
            Source::MyAnimeList => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            Source::AniDb => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            Source::AnimePlanet => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36 Edg/137.0.0.0",
        }
    }

    /// Extra headers sent with every request, besides the user agent.
    /// Names are lowercase so they can be used as static header names.
    pub fn headers(&self) -> &'static [(&'static str, &'static str)] {
        const BROWSER: &[(&str, &str)] = &[
            ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
            ("accept-language", "en-US,en;q=0.5"),
            ("upgrade-insecure-requests", "1"),
        ];
        const NAVIGATION: &[(&str, &str)] = &[
            ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
            ("accept-language", "en-US,en;q=0.5"),
            ("upgrade-insecure-requests", "1"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
        ];

        match self {
            Source::MyAnimeList => &[],
            Source::AniDb => BROWSER,
            Source::AnimePlanet => NAVIGATION,
        }
    }

    /// Built-in categories, in scraping order
    pub fn categories(&self) -> Vec<Category> {
        use CategoryQuery::*;

        match self {
            Source::MyAnimeList => vec![
                Category::new(
                    "action_adventure_shounen",
                    "Action, Adventure, Shounen",
                    "Action, adventure, shounen anime",
                    GenreIds(vec![1, 2, 27]),
                ),
                Category::new("romance", "Romance", "Romance anime", GenreIds(vec![22])),
                Category::new("ecchi_erotica", "Ecchi, Erotica", "Ecchi anime", GenreIds(vec![9])),
                Category::new("slice_of_life", "Slice of Life", "Slice of life anime", GenreIds(vec![36])),
                Category::new("comedy", "Comedy", "Comedy anime", GenreIds(vec![4])),
                Category::new("top_anime", "Top Anime", "Overall top ranked anime", Path("/topanime.php".into())),
                Category::new(
                    "most_popular",
                    "Most Popular",
                    "Anime ranked by member count",
                    Path("/topanime.php?type=bypopularity".into()),
                ),
                Category::new(
                    "top_airing",
                    "Top Airing",
                    "Top ranked currently airing anime",
                    Path("/topanime.php?type=airing".into()),
                ),
            ],
            Source::AniDb => vec![
                Category::new(
                    "action_adventure_shounen",
                    "Action, Adventure, Shounen",
                    "Action, adventure, shounen anime",
                    TagWeights(vec![(2841, 100), (2850, 100), (922, 0)]),
                ),
                Category::new("romance", "Romance", "Romance anime", TagWeights(vec![(2858, 100)])),
                Category::new("ecchi", "Ecchi", "Ecchi anime", TagWeights(vec![(2856, 100)])),
                Category::new("comedy", "Comedy", "Comedy anime", TagWeights(vec![(2853, 100)])),
                Category::new(
                    "highest_rated",
                    "Highest Rated",
                    "Anime ranked by rating",
                    Path("/anime/top/rating".into()),
                ),
                Category::new(
                    "most_popular",
                    "Most Popular",
                    "Anime ranked by popularity",
                    Path("/anime/top/popular".into()),
                ),
            ],
            Source::AnimePlanet => vec![
                Category::new(
                    "action_adventure_shounen",
                    "Action, Adventure, Shounen",
                    "Action, adventure, shounen anime",
                    TagSlugs(vec!["action".into(), "adventure".into(), "shounen".into()]),
                ),
                Category::new("romance", "Romance", "Romance anime", TagSlugs(vec!["romance".into()])),
                Category::new("ecchi", "Ecchi", "Ecchi anime", TagSlugs(vec!["ecchi".into()])),
                Category::new(
                    "slice_of_life",
                    "Slice of Life",
                    "Slice of life anime",
                    TagSlugs(vec!["slice-of-life".into()]),
                ),
                Category::new("comedy", "Comedy", "Comedy anime", TagSlugs(vec!["comedy".into()])),
                Category::new("top_anime", "Top Anime", "Overall top anime", Path("/anime/top-anime".into())),
                Category::new(
                    "highest_rated",
                    "Highest Rated",
                    "Top anime sorted by rating",
                    Path("/anime/top-anime?sort=rating&order=desc".into()),
                ),
            ],
        }
    }

    /// Build every query URL for a category, in fetch order
    pub fn query_urls(&self, query: &CategoryQuery) -> Vec<String> {
        let base = self.base_url();
        match query {
            CategoryQuery::Path(path) => vec![format!("{}{}", base, path)],
            CategoryQuery::GenreIds(ids) => ids
                .iter()
                .map(|id| format!("{}/topanime.php?genre%5B%5D={}", base, id))
                .collect(),
            CategoryQuery::TagWeights(tags) => {
                let mut url = format!("{}/anime/?{}", base, ANIDB_LISTING_QUERY);
                for (tag_id, weight) in tags {
                    url.push_str(&format!("&tag.{}={}", tag_id, weight));
                }
                vec![url]
            }
            CategoryQuery::TagSlugs(slugs) => slugs
                .iter()
                .map(|slug| {
                    format!(
                        "{}/anime/tags/{}?sort=average&order=desc",
                        base,
                        urlencoding::encode(&slug.replace(' ', "-"))
                    )
                })
                .collect(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "myanimelist" | "mal" => Ok(Source::MyAnimeList),
            "anidb" => Ok(Source::AniDb),
            "animeplanet" | "anime-planet" => Ok(Source::AnimePlanet),
            _ => Err(anyhow::anyhow!("Unknown source: {}", s)),
        }
    }
}

/// Maps category keys of one source to query URLs
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    source: Source,
    categories: Vec<Category>,
}

impl CategoryResolver {
    /// Resolver over the source's built-in categories
    pub fn new(source: Source) -> Self {
        Self::with_categories(source, source.categories())
    }

    pub fn with_categories(source: Source, categories: Vec<Category>) -> Self {
        Self { source, categories }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn category(&self, key: &str) -> Result<&Category> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| ScrapeError::CategoryNotFound {
                source_name: self.source.display_name().to_string(),
                key: key.to_string(),
            })
    }

    /// Query URLs for a category key, in fetch order
    pub fn urls_for(&self, key: &str) -> Result<Vec<String>> {
        let category = self.category(key)?;
        let urls = self.source.query_urls(&category.query);
        debug!(
            source = self.source.key(),
            category = key,
            urls = urls.len(),
            "Resolved category"
        );
        Ok(urls)
    }

    /// Every known category key, in table order
    pub fn keys(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.key.as_str()).collect()
    }
}
