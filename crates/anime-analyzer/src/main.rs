//! Anime analyzer CLI application.

use anime_analyzer::{analyze, load_combined, write_common_csv, write_report};
use anyhow::{Context, Result};
use clap::Parser;
use shared::{Config, DataPaths};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Combined results file (default: results/all_anime_data_combined.json)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Report file (default: anime_analysis_report.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "anime-analyzer".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Anime analyzer starting");

    let paths = DataPaths::from_config(&config);
    let input = args.input.unwrap_or_else(|| paths.combined_json());
    let output = args.output.unwrap_or_else(|| paths.analysis_report());

    let data = load_combined(&input)?;
    let report = analyze(&data, &config.analysis, &input.to_string_lossy());

    write_report(&report, &output)?;
    write_common_csv(&report, &paths.analysis_summary_csv())?;

    info!("=== Analysis Complete ===");
    info!(
        sources = report.basic_statistics.total_sources,
        categories = report.basic_statistics.total_categories,
        entries = report.basic_statistics.total_anime_entries,
        "Basic statistics"
    );
    info!(
        common_titles = report.common_anime.total_common,
        "Titles listed by more than one source"
    );
    if let Some(scores) = &report.score_analysis {
        info!(
            scored = scores.total_scored_anime,
            average = format!("{:.2}", scores.average_score),
            median = format!("{:.2}", scores.median_score),
            "Score statistics"
        );
    }
    for (source, comparison) in report.source_comparison.iter() {
        info!(
            source = source,
            entries = comparison.total_entries,
            unique_titles = comparison.unique_titles,
            duplicate_ratio = format!("{:.1}%", comparison.duplicate_ratio * 100.0),
            "Source comparison"
        );
    }

    info!(report = %output.display(), "Anime analyzer finished successfully");
    Ok(())
}
