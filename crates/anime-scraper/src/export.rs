//! JSON and CSV export of scrape results.
//!
//! Every failure here is a [`ScrapeError::Persist`]: downstream tools read
//! these files, so a failed write ends the run.

use crate::error::{Result, ScrapeError};
use anyhow::Context;
use serde::Serialize;
use shared::{AnimeRecord, CombinedResults, ScrapeResult, ScrapingSummary};
use std::fs;
use std::path::Path;
use tracing::info;

/// CSV column order
pub const CSV_COLUMNS: [&str; 7] = [
    "category",
    "rank",
    "title",
    "score",
    "url",
    "additional_info",
    "source",
];

/// One flattened CSV row; field order matches [`CSV_COLUMNS`]
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    category: &'a str,
    rank: u32,
    title: &'a str,
    score: &'a str,
    url: &'a str,
    additional_info: &'a str,
    source: &'a str,
}

impl<'a> From<&'a AnimeRecord> for CsvRow<'a> {
    fn from(record: &'a AnimeRecord) -> Self {
        Self {
            category: &record.category,
            rank: record.rank,
            title: &record.title,
            score: &record.score,
            url: &record.url,
            additional_info: &record.additional_info,
            source: &record.source,
        }
    }
}

/// Write one site's result as JSON and CSV
pub fn write_site(result: &ScrapeResult, json_path: &Path, csv_path: &Path) -> Result<()> {
    write_json(json_path, result)?;
    write_csv(csv_path, result)?;

    let total: usize = result.values().map(Vec::len).sum();
    info!(
        json = %json_path.display(),
        csv = %csv_path.display(),
        categories = result.len(),
        records = total,
        "Exported results"
    );
    Ok(())
}

/// Write the combined source -> result mapping
pub fn write_combined(results: &CombinedResults, path: &Path) -> Result<()> {
    write_json(path, results)?;
    info!(path = %path.display(), sources = results.len(), "Saved combined results");
    Ok(())
}

/// Write the per-source count summary
pub fn write_summary(summary: &ScrapingSummary, path: &Path) -> Result<()> {
    write_json(path, summary)?;
    info!(path = %path.display(), "Saved scraping summary");
    Ok(())
}

/// Pretty-printed UTF-8 JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    persist(path, || {
        ensure_parent(path)?;
        let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, json).context("Failed to write JSON file")?;
        Ok(())
    })
}

/// Flatten every category into one row stream with the fixed column set.
/// An empty result still gets the header row.
pub fn write_csv(path: &Path, result: &ScrapeResult) -> Result<()> {
    persist(path, || {
        ensure_parent(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .context("Failed to create CSV file")?;

        writer
            .write_record(CSV_COLUMNS)
            .context("Failed to write CSV header")?;
        for record in result.values().flatten() {
            writer
                .serialize(CsvRow::from(record))
                .context("Failed to write CSV row")?;
        }
        writer.flush().context("Failed to flush CSV file")?;
        Ok(())
    })
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn persist(path: &Path, write: impl FnOnce() -> anyhow::Result<()>) -> Result<()> {
    write().map_err(|source| ScrapeError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Local;
    use shared::OrderedMap;
    use tempfile::TempDir;

    fn record(rank: u32, title: &str, score: &str, category: &str) -> AnimeRecord {
        AnimeRecord {
            rank,
            title: title.to_string(),
            score: score.to_string(),
            url: "https://anidb.net/anime/1".to_string(),
            additional_info: "Type: TV Series | Episodes: 26".to_string(),
            source: "AniDB".to_string(),
            category: category.to_string(),
        }
    }

    fn sample() -> ScrapeResult {
        let mut result = ScrapeResult::new();
        result.insert(
            "romance",
            vec![
                record(1, "Clannad: After Story", "9.01", "Romance"),
                record(2, "Toradora!", "N/A", "Romance"),
            ],
        );
        result.insert("comedy", vec![record(1, "Gintama, \"The Movie\"", "8.9", "Comedy")]);
        result.insert("ecchi", Vec::new());
        result
    }

    #[test]
    fn test_json_keeps_category_order() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("results").join("anidb_top_anime.json");
        write_json(&path, &sample())?;

        let text = fs::read_to_string(&path)?;
        let romance = text.find("\"romance\"").unwrap();
        let comedy = text.find("\"comedy\"").unwrap();
        let ecchi = text.find("\"ecchi\"").unwrap();
        assert!(romance < comedy && comedy < ecchi);

        let loaded: ScrapeResult = serde_json::from_str(&text)?;
        assert_eq!(loaded, sample());
        assert!(loaded.get("ecchi").unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn test_csv_fixed_columns() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("anidb_top_anime.csv");
        write_csv(&path, &sample())?;

        let mut reader = csv::Reader::from_path(&path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        assert_eq!(headers, CSV_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "Romance");
        assert_eq!(&rows[0][1], "1");
        assert_eq!(&rows[1][3], "N/A");
        assert_eq!(&rows[2][2], "Gintama, \"The Movie\"");
        assert_eq!(&rows[2][6], "AniDB");
        Ok(())
    }

    #[test]
    fn test_empty_csv_has_header_only() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("empty.csv");
        write_csv(&path, &ScrapeResult::new())?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(text.trim_end(), CSV_COLUMNS.join(","));
        Ok(())
    }

    #[test]
    fn test_combined_and_summary() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut combined = CombinedResults::new();
        combined.insert("anidb", sample());
        combined.insert("animeplanet", OrderedMap::new());

        let combined_path = temp_dir.path().join("all_anime_data_combined.json");
        write_combined(&combined, &combined_path)?;
        let loaded: CombinedResults = serde_json::from_str(&fs::read_to_string(&combined_path)?)?;
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["anidb", "animeplanet"]);
        assert!(loaded.get("animeplanet").unwrap().is_empty());

        let summary_path = temp_dir.path().join("scraping_summary.json");
        write_summary(&ScrapingSummary::from_results(&combined, Local::now()), &summary_path)?;
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&summary_path)?)?;
        assert_eq!(value["total_sources"], 2);
        assert_eq!(value["sources"]["anidb"]["total_anime_entries"], 3);
        assert_eq!(value["sources"]["anidb"]["categories"]["ecchi"], 0);
        Ok(())
    }

    #[test]
    fn test_unwritable_path_is_persist_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let blocker = temp_dir.path().join("results");
        fs::write(&blocker, "not a directory")?;

        let err = write_json(&blocker.join("out.json"), &sample()).unwrap_err();
        assert!(matches!(err, ScrapeError::Persist { .. }));
        Ok(())
    }
}
