//! Data models shared by the scrapers and the analyzer.
//!
//! Records, categories and the insertion-ordered result maps written to the
//! `results/` directory.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel written for absent scores, URLs and descriptive text
pub const NOT_AVAILABLE: &str = "N/A";

/// One ranked anime entry from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeRecord {
    /// 1-based position within its category
    #[serde(deserialize_with = "rank_from_number_or_string")]
    pub rank: u32,
    pub title: String,
    /// Decimal string in [0, 10], or "N/A"
    pub score: String,
    /// Detail page URL, or "N/A"
    pub url: String,
    /// Type / episode count text, or "N/A"
    pub additional_info: String,
    /// Site display name
    pub source: String,
    /// Category display label
    #[serde(default)]
    pub category: String,
}

// Older exports wrote ranks as strings ("1"); an unparsable rank reads as 0
// and is logged.
fn rank_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRank {
        Number(u32),
        Text(String),
    }

    Ok(match RawRank::deserialize(deserializer)? {
        RawRank::Number(n) => n,
        RawRank::Text(s) => s.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(rank = %s, "Unparsable rank, reading as 0");
            0
        }),
    })
}

/// How a category is expressed in a site's query URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryQuery {
    /// Numeric genre IDs, one query per ID
    GenreIds(Vec<u32>),
    /// Numeric tag IDs with inclusion weights, combined in a single query
    TagWeights(Vec<(u32, u32)>),
    /// Textual tag slugs, one query per slug
    TagSlugs(Vec<String>),
    /// A fixed ranking-list path (path + query, relative to the base URL)
    Path(String),
}

/// A logical category scraped as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Stable key used in output files and on the command line
    pub key: String,
    /// Display label written into records
    pub name: String,
    pub description: String,
    pub query: CategoryQuery,
}

impl Category {
    pub fn new(key: &str, name: &str, description: &str, query: CategoryQuery) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            query,
        }
    }
}

/// String-keyed map that serializes entries in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedMap<V> {
    entries: IndexMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Category key -> records, for one site
pub type ScrapeResult = OrderedMap<Vec<AnimeRecord>>;

/// Source key -> per-site result
pub type CombinedResults = OrderedMap<ScrapeResult>;

/// Per-source record counts written next to the combined results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingSummary {
    pub total_sources: usize,
    pub scraping_timestamp: String,
    pub sources: OrderedMap<SourceSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub categories_scraped: usize,
    pub total_anime_entries: usize,
    pub categories: OrderedMap<usize>,
}

impl ScrapingSummary {
    pub fn from_results(results: &CombinedResults, at: DateTime<Local>) -> Self {
        let sources = results
            .iter()
            .map(|(source, categories)| {
                let counts: OrderedMap<usize> = categories
                    .iter()
                    .map(|(key, records)| (key.to_string(), records.len()))
                    .collect();
                let summary = SourceSummary {
                    categories_scraped: categories.len(),
                    total_anime_entries: counts.values().sum(),
                    categories: counts,
                };
                (source.to_string(), summary)
            })
            .collect();

        Self {
            total_sources: results.len(),
            scraping_timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: u32, title: &str) -> AnimeRecord {
        AnimeRecord {
            rank,
            title: title.to_string(),
            score: "8.50".to_string(),
            url: NOT_AVAILABLE.to_string(),
            additional_info: NOT_AVAILABLE.to_string(),
            source: "AniDB".to_string(),
            category: "Romance".to_string(),
        }
    }

    #[test]
    fn test_ordered_map_preserves_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        map.insert("zeta", 3);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":3,"alpha":2}"#);

        let back: OrderedMap<i32> = serde_json::from_str(r#"{"b":1,"a":2,"c":3}"#).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_unparsable_legacy_rank_reads_as_zero() {
        let json = r#"{"rank":"N/A","title":"X","score":"N/A","url":"N/A",
            "additional_info":"N/A","source":"AniDB"}"#;
        let parsed: AnimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.rank, 0);
        assert_eq!(parsed.category, "");
    }

    #[test]
    fn test_rank_accepts_string_or_number() {
        let json = r#"{"rank":"7","title":"X","score":"N/A","url":"N/A",
            "additional_info":"N/A","source":"MyAnimeList","category":"Comedy"}"#;
        let parsed: AnimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.rank, 7);
        assert_eq!(parsed.score, NOT_AVAILABLE);

        let json = serde_json::to_string(&record(3, "Y")).unwrap();
        assert!(json.starts_with(r#"{"rank":3,"title":"Y""#));
    }

    #[test]
    fn test_summary_counts_empty_categories() {
        let mut site = ScrapeResult::new();
        site.insert("romance", vec![record(1, "A"), record(2, "B")]);
        site.insert("comedy", Vec::new());
        let mut combined = CombinedResults::new();
        combined.insert("anidb", site);
        combined.insert("animeplanet", ScrapeResult::new());

        let summary = ScrapingSummary::from_results(&combined, Local::now());
        assert_eq!(summary.total_sources, 2);
        let anidb = summary.sources.get("anidb").unwrap();
        assert_eq!(anidb.categories_scraped, 2);
        assert_eq!(anidb.total_anime_entries, 2);
        assert_eq!(anidb.categories.get("comedy"), Some(&0));
        assert_eq!(summary.sources.get("animeplanet").unwrap().total_anime_entries, 0);
    }
}
