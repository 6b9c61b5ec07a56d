//! Listing-page extraction strategies, one per source.
//!
//! Every strategy locates the listing entries through a prioritized chain of
//! selectors and turns each entry into an [`AnimeRecord`]. A page that matches
//! none of the selectors yields no records; an entry without a title is
//! skipped without stopping the rest of the page.

mod anidb;
mod animeplanet;
mod myanimelist;

pub use anidb::AniDbExtractor;
pub use animeplanet::AnimePlanetExtractor;
pub use myanimelist::MyAnimeListExtractor;

use crate::error::{Result, ScrapeError};
use crate::source::Source;
use scraper::{ElementRef, Html, Selector};
use shared::text::normalize_score;
use shared::{AnimeRecord, NOT_AVAILABLE};
use tracing::{debug, info, warn};
use url::Url;

/// Delimiter between parts of `additional_info`
pub const INFO_DELIMITER: &str = " | ";

/// Turns one source's listing page into records
pub trait ListExtractor {
    fn source(&self) -> Source;

    /// Listing entries in page order, from the first selector that matches
    fn entries<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>>;

    /// Build a record from one entry; `position` is its 1-based index
    fn extract_entry(&self, entry: ElementRef<'_>, position: usize, category: &str)
        -> Result<AnimeRecord>;

    /// Extract up to `limit` records from a page
    fn extract(&self, document: &str, category_label: &str, limit: usize) -> Vec<AnimeRecord> {
        let html = Html::parse_document(document);
        let entries = self.entries(&html);

        if entries.is_empty() {
            let mismatch = ScrapeError::ExtractionMismatch(format!(
                "no {} listing found",
                self.source().display_name()
            ));
            warn!(category = %category_label, error = %mismatch, "Nothing to extract");
            return Vec::new();
        }

        debug!(entries = entries.len(), "Found listing entries");

        let mut records = Vec::new();
        for (index, entry) in entries.into_iter().take(limit).enumerate() {
            match self.extract_entry(entry, index + 1, category_label) {
                Ok(record) => records.push(record),
                Err(e) => debug!(position = index + 1, error = %e, "Skipping entry"),
            }
        }

        info!(
            source = self.source().key(),
            category = %category_label,
            records = records.len(),
            "Extracted records"
        );
        records
    }
}

/// The extraction strategy for a source
pub fn extractor_for(source: Source) -> Box<dyn ListExtractor> {
    match source {
        Source::MyAnimeList => Box::new(MyAnimeListExtractor),
        Source::AniDb => Box::new(AniDbExtractor),
        Source::AnimePlanet => Box::new(AnimePlanetExtractor),
    }
}

/// Parse a built-in selector
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("built-in selector must parse")
}

/// Elements matched by the first selector in the chain that matches anything
pub(crate) fn select_first_chain<'a>(
    document: &'a Html,
    chain: &[&Selector],
) -> Vec<ElementRef<'a>> {
    for selector in chain {
        let found: Vec<_> = document.select(selector).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// First element under `scope` matched by any selector in the chain
pub(crate) fn find_first<'a>(scope: ElementRef<'a>, chain: &[&Selector]) -> Option<ElementRef<'a>> {
    chain
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

/// First element under `scope`, in chain order, whose text is not blank
pub(crate) fn find_with_text<'a>(
    scope: ElementRef<'a>,
    chain: &[&Selector],
) -> Option<ElementRef<'a>> {
    chain.iter().find_map(|selector| {
        scope
            .select(selector)
            .find(|el| !element_text(*el).is_empty())
    })
}

/// Element text with whitespace runs collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-blank text lines of an element, each whitespace-collapsed
pub(crate) fn element_lines(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .flat_map(|chunk| chunk.lines())
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Absolute URL for a link, or "N/A" when there is none
pub(crate) fn resolve_url(base: &str, href: Option<&str>) -> String {
    let href = match href.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return NOT_AVAILABLE.to_string(),
    };

    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| NOT_AVAILABLE.to_string())
}

/// Join info parts, or "N/A" when nothing was found
pub(crate) fn join_info(parts: Vec<String>) -> String {
    let parts: Vec<_> = parts.into_iter().filter(|p| !p.trim().is_empty()).collect();
    if parts.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        parts.join(INFO_DELIMITER)
    }
}

/// Assemble a record, normalizing the score text
pub(crate) fn build_record(
    source: Source,
    rank: u32,
    title: String,
    raw_score: Option<&str>,
    url: String,
    additional_info: String,
    category: &str,
) -> Result<AnimeRecord> {
    let title = title.trim().to_string();
    if title.is_empty() || title == NOT_AVAILABLE {
        return Err(ScrapeError::ExtractionMismatch(format!(
            "entry {} has no title",
            rank
        )));
    }

    Ok(AnimeRecord {
        rank,
        title,
        score: raw_score
            .map(normalize_score)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        url,
        additional_info,
        source: source.display_name().to_string(),
        category: category.to_string(),
    })
}
