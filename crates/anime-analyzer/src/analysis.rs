//! Statistics over the combined results.
//!
//! Cross-source matching uses [`shared::text::normalize_title`], the same
//! key the scraper merges on.

use crate::report::{
    AnalysisReport, BasicStatistics, CategoryAnalysis, CommonAnime, CommonTitle, Metadata,
    Occurrence, ScoreAnalysis, SourceComparison, SourceStatistics, TitleAnalysis,
    TitleStatistics, ANALYZER_VERSION,
};
use chrono::Local;
use shared::config::AnalysisConfig;
use shared::text::{in_score_range, normalize_title, title_words};
use shared::{AnimeRecord, CombinedResults, OrderedMap, NOT_AVAILABLE};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Words this short are left out of the word counts
const MIN_WORD_LEN: usize = 3;

/// Run every analysis over the combined results
pub fn analyze(data: &CombinedResults, config: &AnalysisConfig, source_file: &str) -> AnalysisReport {
    info!(sources = data.len(), "Starting analysis");

    let report = AnalysisReport {
        basic_statistics: basic_statistics(data),
        common_anime: common_anime(data, config.top_common),
        score_analysis: score_analysis(data),
        category_analysis: category_analysis(data),
        source_comparison: source_comparison(data),
        title_analysis: title_analysis(data, config.top_words),
        metadata: Metadata {
            analysis_timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source_file: source_file.to_string(),
            analyzer_version: ANALYZER_VERSION.to_string(),
        },
    };

    info!(
        entries = report.basic_statistics.total_anime_entries,
        common_titles = report.common_anime.total_common,
        "Analysis complete"
    );
    report
}

/// Every record with its source and category keys
fn records(data: &CombinedResults) -> impl Iterator<Item = (&str, &str, &AnimeRecord)> {
    data.iter().flat_map(|(source, categories)| {
        categories.iter().flat_map(move |(category, list)| {
            list.iter().map(move |record| (source, category, record))
        })
    })
}

pub fn basic_statistics(data: &CombinedResults) -> BasicStatistics {
    let mut stats = BasicStatistics {
        total_sources: data.len(),
        total_categories: 0,
        total_anime_entries: 0,
        sources: OrderedMap::new(),
    };

    for (source, categories) in data.iter() {
        let total_entries: usize = categories.values().map(Vec::len).sum();
        stats.total_categories += categories.len();
        stats.total_anime_entries += total_entries;

        let avg_entries_per_category = if categories.is_empty() {
            0.0
        } else {
            total_entries as f64 / categories.len() as f64
        };
        stats.sources.insert(
            source,
            SourceStatistics {
                categories: categories.len(),
                total_entries,
                avg_entries_per_category,
            },
        );
    }

    stats
}

/// Titles listed by more than one source, most widely listed first.
/// Equal source counts keep the order titles were first seen in.
pub fn common_anime(data: &CombinedResults, top: usize) -> CommonAnime {
    let mut titles: OrderedMap<CommonTitle> = OrderedMap::new();

    for (source, category, record) in records(data) {
        let key = normalize_title(&record.title);
        if key.is_empty() {
            continue;
        }

        let occurrence = Occurrence {
            source: source.to_string(),
            category: category.to_string(),
            rank: record.rank,
            score: record.score.clone(),
            original_title: record.title.clone(),
        };

        match titles.get_mut(&key) {
            Some(entry) => {
                if !entry.sources.iter().any(|s| s == source) {
                    entry.sources.push(source.to_string());
                    entry.source_count += 1;
                }
                entry.data.push(occurrence);
            }
            None => titles.insert(
                key,
                CommonTitle {
                    sources: vec![source.to_string()],
                    source_count: 1,
                    data: vec![occurrence],
                },
            ),
        }
    }

    let mut common: Vec<(String, CommonTitle)> = titles
        .iter()
        .filter(|(_, entry)| entry.source_count > 1)
        .map(|(title, entry)| (title.to_string(), entry.clone()))
        .collect();
    common.sort_by(|a, b| b.1.source_count.cmp(&a.1.source_count));

    debug!(candidates = titles.len(), common = common.len(), "Matched titles");

    CommonAnime {
        total_common: common.len(),
        top_common: common.into_iter().take(top).collect(),
    }
}

/// Summary of every score that parses inside the valid range
pub fn score_analysis(data: &CombinedResults) -> Option<ScoreAnalysis> {
    let mut all_scores = Vec::new();
    let mut by_source: OrderedMap<Vec<f64>> = OrderedMap::new();

    for (source, _, record) in records(data) {
        let score = match valid_score(&record.score) {
            Some(score) => score,
            None => continue,
        };

        all_scores.push(score);
        match by_source.get_mut(source) {
            Some(scores) => scores.push(score),
            None => by_source.insert(source, vec![score]),
        }
    }

    if all_scores.is_empty() {
        return None;
    }

    Some(ScoreAnalysis {
        total_scored_anime: all_scores.len(),
        average_score: mean(&all_scores),
        median_score: median(&all_scores),
        min_score: all_scores.iter().copied().fold(f64::INFINITY, f64::min),
        max_score: all_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        source_averages: by_source
            .iter()
            .map(|(source, scores)| (source.to_string(), mean(scores)))
            .collect(),
    })
}

fn valid_score(score: &str) -> Option<f64> {
    if score == NOT_AVAILABLE {
        return None;
    }
    score
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| in_score_range(*value))
}

pub fn category_analysis(data: &CombinedResults) -> CategoryAnalysis {
    let mut overall: OrderedMap<usize> = OrderedMap::new();
    let mut by_source = OrderedMap::new();

    for (source, categories) in data.iter() {
        let mut counts = OrderedMap::new();
        for (category, list) in categories.iter() {
            counts.insert(category, list.len());
            match overall.get_mut(category) {
                Some(total) => *total += list.len(),
                None => overall.insert(category, list.len()),
            }
        }
        by_source.insert(source, counts);
    }

    CategoryAnalysis {
        overall_categories: overall,
        by_source,
    }
}

pub fn source_comparison(data: &CombinedResults) -> OrderedMap<SourceComparison> {
    data.iter()
        .map(|(source, categories)| {
            let total_entries: usize = categories.values().map(Vec::len).sum();
            let categories_with_data = categories.values().filter(|l| !l.is_empty()).count();
            let unique_titles = categories
                .values()
                .flatten()
                .map(|record| normalize_title(&record.title))
                .filter(|title| !title.is_empty())
                .collect::<HashSet<_>>()
                .len();

            let duplicate_ratio = if total_entries == 0 {
                0.0
            } else {
                (total_entries - unique_titles) as f64 / total_entries as f64
            };

            (
                source.to_string(),
                SourceComparison {
                    total_entries,
                    unique_titles,
                    categories_with_data,
                    duplicate_ratio,
                },
            )
        })
        .collect()
}

/// Title length statistics and the most frequent title words
pub fn title_analysis(data: &CombinedResults, top_words: usize) -> Option<TitleAnalysis> {
    let titles: Vec<&str> = records(data)
        .map(|(_, _, record)| record.title.trim())
        .filter(|title| !title.is_empty() && *title != NOT_AVAILABLE)
        .collect();

    if titles.is_empty() {
        return None;
    }

    let lengths: Vec<f64> = titles.iter().map(|t| t.chars().count() as f64).collect();
    let statistics = TitleStatistics {
        total_titles: titles.len(),
        average_length: mean(&lengths),
        median_length: median(&lengths),
        min_length: titles.iter().map(|t| t.chars().count()).min().unwrap_or(0),
        max_length: titles.iter().map(|t| t.chars().count()).max().unwrap_or(0),
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for title in &titles {
        for word in title_words(title) {
            if word.chars().count() >= MIN_WORD_LEN {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(top_words);

    Some(TitleAnalysis {
        statistics,
        common_words: words.into_iter().collect(),
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ScrapeResult;

    fn record(rank: u32, title: &str, score: &str, source: &str) -> AnimeRecord {
        AnimeRecord {
            rank,
            title: title.to_string(),
            score: score.to_string(),
            url: NOT_AVAILABLE.to_string(),
            additional_info: NOT_AVAILABLE.to_string(),
            source: source.to_string(),
            category: String::new(),
        }
    }

    fn sample() -> CombinedResults {
        let mut mal = ScrapeResult::new();
        mal.insert(
            "romance",
            vec![
                record(1, "Your Name.", "9.2", "MyAnimeList"),
                record(2, "Clannad: After Story", "9.0", "MyAnimeList"),
                record(3, "Toradora!", "N/A", "MyAnimeList"),
            ],
        );
        mal.insert("comedy", vec![record(1, "Toradora", "8.1", "MyAnimeList")]);

        let mut anidb = ScrapeResult::new();
        anidb.insert("romance", vec![record(4, "your name", "8.8", "AniDB")]);
        anidb.insert("ecchi", Vec::new());

        let mut combined = CombinedResults::new();
        combined.insert("myanimelist", mal);
        combined.insert("anidb", anidb);
        combined.insert("animeplanet", ScrapeResult::new());
        combined
    }

    #[test]
    fn test_common_title_across_sources() {
        let common = common_anime(&sample(), 50);
        assert_eq!(common.total_common, 1);

        let your_name = common.top_common.get("your name").unwrap();
        assert_eq!(your_name.source_count, 2);
        assert_eq!(your_name.sources, vec!["myanimelist", "anidb"]);
        assert_eq!(your_name.data.len(), 2);
        assert_eq!(your_name.data[0].score, "9.2");
        assert_eq!(your_name.data[0].rank, 1);
        assert_eq!(your_name.data[1].score, "8.8");
        assert_eq!(your_name.data[1].rank, 4);
        assert_eq!(your_name.data[1].original_title, "your name");

        // Same source twice is not a common title
        assert!(common.top_common.get("toradora").is_none());
    }

    #[test]
    fn test_common_titles_sorted_by_source_count() {
        let mut combined = CombinedResults::new();
        for source in ["myanimelist", "anidb", "animeplanet"] {
            let mut result = ScrapeResult::new();
            let mut list = vec![record(1, "Monster", "8.9", source)];
            if source != "animeplanet" {
                list.insert(0, record(2, "Mushishi", "8.7", source));
            }
            result.insert("top", list);
            combined.insert(source, result);
        }

        let common = common_anime(&combined, 50);
        let order: Vec<_> = common.top_common.keys().collect();
        assert_eq!(order, vec!["monster", "mushishi"]);
        assert_eq!(common.top_common.get("monster").unwrap().source_count, 3);

        assert_eq!(common_anime(&combined, 1).top_common.len(), 1);
        assert_eq!(common_anime(&combined, 1).total_common, 2);
    }

    #[test]
    fn test_score_analysis() {
        let scores = score_analysis(&sample()).unwrap();
        assert_eq!(scores.total_scored_anime, 4);
        assert!((scores.average_score - 8.775).abs() < 1e-9);
        assert!((scores.median_score - 8.9).abs() < 1e-9);
        assert_eq!(scores.min_score, 8.1);
        assert_eq!(scores.max_score, 9.2);
        assert!((scores.source_averages.get("anidb").unwrap() - 8.8).abs() < 1e-9);
        assert!(scores.source_averages.get("animeplanet").is_none());
    }

    #[test]
    fn test_out_of_range_scores_are_ignored() {
        let mut result = ScrapeResult::new();
        result.insert(
            "top",
            vec![
                record(1, "A", "85", "AniDB"),
                record(2, "B", "N/A", "AniDB"),
                record(3, "C", "-1", "AniDB"),
            ],
        );
        let mut combined = CombinedResults::new();
        combined.insert("anidb", result);
        assert!(score_analysis(&combined).is_none());
    }

    #[test]
    fn test_basic_and_category_statistics() {
        let data = sample();
        let basic = basic_statistics(&data);
        assert_eq!(basic.total_sources, 3);
        assert_eq!(basic.total_categories, 4);
        assert_eq!(basic.total_anime_entries, 5);
        assert_eq!(basic.sources.get("myanimelist").unwrap().avg_entries_per_category, 2.0);
        assert_eq!(basic.sources.get("animeplanet").unwrap().avg_entries_per_category, 0.0);

        let categories = category_analysis(&data);
        assert_eq!(categories.overall_categories.get("romance"), Some(&4));
        assert_eq!(categories.overall_categories.get("ecchi"), Some(&0));
        assert_eq!(
            categories.by_source.get("anidb").unwrap().keys().collect::<Vec<_>>(),
            vec!["romance", "ecchi"]
        );
    }

    #[test]
    fn test_source_comparison() {
        let comparison = source_comparison(&sample());
        let mal = comparison.get("myanimelist").unwrap();
        assert_eq!(mal.total_entries, 4);
        assert_eq!(mal.unique_titles, 3);
        assert_eq!(mal.categories_with_data, 2);
        assert!((mal.duplicate_ratio - 0.25).abs() < 1e-9);

        let anidb = comparison.get("anidb").unwrap();
        assert_eq!(anidb.categories_with_data, 1);
        assert_eq!(comparison.get("animeplanet").unwrap().duplicate_ratio, 0.0);
    }

    #[test]
    fn test_title_analysis() {
        let titles = title_analysis(&sample(), 50).unwrap();
        assert_eq!(titles.statistics.total_titles, 5);
        assert_eq!(titles.statistics.min_length, 8);
        assert_eq!(titles.statistics.max_length, 20);

        let words: Vec<_> = titles.common_words.iter().collect();
        assert_eq!(words[0], ("name", &2));
        assert_eq!(words[1], ("toradora", &2));
        assert_eq!(words[2], ("your", &2));
        assert!(titles.common_words.get("after").is_some());

        let top_two = title_analysis(&sample(), 2).unwrap();
        assert_eq!(top_two.common_words.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let report = analyze(&CombinedResults::new(), &AnalysisConfig::default(), "combined.json");
        assert_eq!(report.basic_statistics.total_sources, 0);
        assert_eq!(report.common_anime.total_common, 0);
        assert!(report.score_analysis.is_none());
        assert!(report.title_analysis.is_none());
        assert_eq!(report.metadata.analyzer_version, "1.0");
        assert_eq!(report.metadata.source_file, "combined.json");
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }
}
