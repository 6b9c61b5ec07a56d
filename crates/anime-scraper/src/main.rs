//! Anime list scraper CLI application.

use anime_scraper::{run_sources, selected_sources, RunOptions, Source};
use anyhow::{Context, Result};
use clap::Parser;
use shared::Config;
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

    /// Clear each site's cached pages before scraping it
    #[arg(long)]
    clear_cache: bool,

    /// Site to scrape (myanimelist, anidb, animeplanet); repeatable
    #[arg(short, long = "source")]
    sources: Vec<Source>,

    /// Category key to scrape; repeatable
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Records kept per category
    #[arg(short, long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "anime-scraper".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!("Anime scraper starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let sources = selected_sources(&config, &args.sources);
    if sources.is_empty() {
        info!("No sites enabled, nothing to do");
        return Ok(());
    }

    let mut options = RunOptions::from_config(&config);
    options.categories = args.categories;
    options.clear_cache = args.clear_cache;
    if let Some(limit) = args.limit {
        options.limit = limit;
    }

    info!(
        sources = ?sources.iter().map(|s| s.key()).collect::<Vec<_>>(),
        limit = options.limit,
        "Starting scrape"
    );

    let combined = run_sources(&config, &sources, &options)
        .await
        .context("Scraper failed")?;

    info!("=== Scraping Complete ===");
    for (source, categories) in combined.iter() {
        let total: usize = categories.values().map(Vec::len).sum();
        info!(
            source = source,
            categories = categories.len(),
            records = total,
            "Source summary"
        );
    }

    info!("Anime scraper finished successfully");
    Ok(())
}
