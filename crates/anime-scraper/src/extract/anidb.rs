//! AniDB tag search and ranking tables (`table#animelist`).

use super::{
    build_record, css, element_text, join_info, resolve_url, ListExtractor,
};
use crate::error::Result;
use crate::source::Source;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use shared::AnimeRecord;

static TABLE_BY_ID: Lazy<Selector> = Lazy::new(|| css("table#animelist"));
static TABLE_BY_CLASS: Lazy<Selector> = Lazy::new(|| css("table.animelist"));
static BODY_ROW: Lazy<Selector> = Lazy::new(|| css("tbody tr"));

static NAME_CELL: Lazy<Selector> = Lazy::new(|| css("td.name"));
static NAME_LINK: Lazy<Selector> = Lazy::new(|| css("td.name a"));
static RATING_CELL: Lazy<Selector> = Lazy::new(|| css("td.rating"));
static WEIGHTED_CELL: Lazy<Selector> = Lazy::new(|| css("td.weighted"));
static TYPE_CELL: Lazy<Selector> = Lazy::new(|| css("td.type"));
static EPS_CELL: Lazy<Selector> = Lazy::new(|| css("td.eps"));

/// Ratings print as "9.73 (3700)"; the vote count must not be taken for a score
static RATING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.\d+").expect("valid regex"));

/// AniDB listing extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct AniDbExtractor;

impl ListExtractor for AniDbExtractor {
    fn source(&self) -> Source {
        Source::AniDb
    }

    fn entries<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let table = document
            .select(&TABLE_BY_ID)
            .next()
            .or_else(|| document.select(&TABLE_BY_CLASS).next());

        match table {
            // Header rows carry no name cell
            Some(table) => table
                .select(&BODY_ROW)
                .filter(|row| row.select(&NAME_CELL).next().is_some())
                .collect(),
            None => Vec::new(),
        }
    }

    fn extract_entry(
        &self,
        entry: ElementRef<'_>,
        position: usize,
        category: &str,
    ) -> Result<AnimeRecord> {
        let link = entry.select(&NAME_LINK).next();
        let title = link.map(element_text).unwrap_or_default();
        let url = resolve_url(
            Source::AniDb.base_url(),
            link.and_then(|a| a.value().attr("href")),
        );

        let rating_text = entry
            .select(&RATING_CELL)
            .next()
            .or_else(|| entry.select(&WEIGHTED_CELL).next())
            .map(element_text)
            .unwrap_or_default();
        let score = RATING.find(&rating_text).map(|m| m.as_str());

        let mut info = Vec::new();
        if let Some(cell) = entry.select(&TYPE_CELL).next() {
            info.push(format!("Type: {}", element_text(cell)));
        }
        if let Some(cell) = entry.select(&EPS_CELL).next() {
            info.push(format!("Episodes: {}", element_text(cell)));
        }

        build_record(
            Source::AniDb,
            position as u32,
            title,
            score,
            url,
            join_info(info),
            category,
        )
    }
}
