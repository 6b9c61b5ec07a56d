//! Analysis report types and their JSON/CSV files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::{CombinedResults, OrderedMap};
use std::fs;
use std::path::Path;
use tracing::info;

/// Version written into the report metadata
pub const ANALYZER_VERSION: &str = "1.0";

/// Full analyzer output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub basic_statistics: BasicStatistics,
    pub common_anime: CommonAnime,
    /// Absent when no record carries a valid score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_analysis: Option<ScoreAnalysis>,
    pub category_analysis: CategoryAnalysis,
    pub source_comparison: OrderedMap<SourceComparison>,
    /// Absent when there are no titles at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_analysis: Option<TitleAnalysis>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicStatistics {
    pub total_sources: usize,
    pub total_categories: usize,
    pub total_anime_entries: usize,
    pub sources: OrderedMap<SourceStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatistics {
    pub categories: usize,
    pub total_entries: usize,
    pub avg_entries_per_category: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonAnime {
    pub total_common: usize,
    /// Normalized title -> occurrences, most widely listed first
    pub top_common: OrderedMap<CommonTitle>,
}

/// A normalized title listed by more than one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonTitle {
    /// Distinct source keys, in order of first appearance
    pub sources: Vec<String>,
    pub source_count: usize,
    pub data: Vec<Occurrence>,
}

/// One listing of a title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub source: String,
    pub category: String,
    pub rank: u32,
    pub score: String,
    pub original_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreAnalysis {
    pub total_scored_anime: usize,
    pub average_score: f64,
    pub median_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub source_averages: OrderedMap<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    pub overall_categories: OrderedMap<usize>,
    pub by_source: OrderedMap<OrderedMap<usize>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceComparison {
    pub total_entries: usize,
    pub unique_titles: usize,
    pub categories_with_data: usize,
    /// `1 - unique_titles / total_entries`, 0 for an empty source
    pub duplicate_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleAnalysis {
    pub statistics: TitleStatistics,
    pub common_words: OrderedMap<usize>,
}

/// Title lengths in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleStatistics {
    pub total_titles: usize,
    pub average_length: f64,
    pub median_length: f64,
    pub min_length: usize,
    pub max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub analysis_timestamp: String,
    pub source_file: String,
    pub analyzer_version: String,
}

/// Load the combined scrape results
pub fn load_combined(path: &Path) -> Result<CombinedResults> {
    let content = fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read {}; run the scraper first",
            path.display()
        )
    })?;
    let data: CombinedResults = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    info!(path = %path.display(), sources = data.len(), "Loaded combined results");
    Ok(data)
}

/// Write the full report as pretty JSON
pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    info!(path = %path.display(), "Analysis report exported");
    Ok(())
}

/// Write the common titles as `Title, Sources, Source Count, Details`
pub fn write_common_csv(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["Title", "Sources", "Source Count", "Details"])?;
    for (title, common) in report.common_anime.top_common.iter() {
        let details = common
            .data
            .iter()
            .map(|o| format!("{}:Rank{}({})", o.source, o.rank, o.score))
            .collect::<Vec<_>>()
            .join("; ");
        writer.write_record([
            title,
            common.sources.join(", ").as_str(),
            common.source_count.to_string().as_str(),
            details.as_str(),
        ])?;
    }
    writer.flush()?;

    info!(
        path = %path.display(),
        titles = report.common_anime.top_common.len(),
        "Common title summary exported"
    );
    Ok(())
}
