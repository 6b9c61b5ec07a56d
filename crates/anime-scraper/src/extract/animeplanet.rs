//! AnimePlanet card decks (`ul.cardDeck li.card`).
//!
//! Cards rarely show the rating directly. It usually sits in the HTML tooltip
//! stored in the main link's `title` attribute, so the score falls back
//! through the card, the tooltip and finally `data-*` attributes.

use super::{
    build_record, css, element_text, join_info, resolve_url, select_first_chain, ListExtractor,
};
use crate::error::Result;
use crate::source::Source;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use shared::AnimeRecord;

static DECK_CARD: Lazy<Selector> = Lazy::new(|| css("ul.cardDeck li.card"));
static ANY_CARD: Lazy<Selector> = Lazy::new(|| css("li.card"));

static ANIME_LINK: Lazy<Selector> = Lazy::new(|| css("a[href*=\"/anime/\"]"));
static CARD_NAME: Lazy<Selector> = Lazy::new(|| css("h3.cardName"));
static RATING: Lazy<Selector> = Lazy::new(|| css(".avgRating, .rating, .score"));
static ENTRY_BAR: Lazy<Selector> = Lazy::new(|| css(".entryBar li"));

static TOOLTIP_RATING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<div class=.?ttRating.?>([^<]+)</div>").expect("valid regex"));
static LABELLED_RATING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Rating:\s*(\d+\.?\d*)").expect("valid regex"));
static STAR_RATING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*(?:/|out of|★)").expect("valid regex"));
static TOOLTIP_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<li class=.*?type.*?>(.*?)</li>").expect("valid regex"));
static TOOLTIP_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<li class=.*?iconYear.*?>(.*?)</li>").expect("valid regex"));

/// Entry bar items kept in `additional_info`
const ENTRY_BAR_ITEMS: usize = 3;

/// AnimePlanet listing extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimePlanetExtractor;

impl ListExtractor for AnimePlanetExtractor {
    fn source(&self) -> Source {
        Source::AnimePlanet
    }

    fn entries<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        select_first_chain(document, &[&*DECK_CARD, &*ANY_CARD])
    }

    fn extract_entry(
        &self,
        entry: ElementRef<'_>,
        position: usize,
        category: &str,
    ) -> Result<AnimeRecord> {
        let link = entry.select(&ANIME_LINK).next();
        let tooltip = link.and_then(|a| a.value().attr("title")).unwrap_or("");

        let title = entry
            .select(&CARD_NAME)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .or_else(|| link.map(element_text))
            .unwrap_or_default();
        let url = resolve_url(
            Source::AnimePlanet.base_url(),
            link.and_then(|a| a.value().attr("href")),
        );

        let score = card_score(entry, tooltip);
        let info = card_info(entry, tooltip);

        build_record(
            Source::AnimePlanet,
            position as u32,
            title,
            score.as_deref(),
            url,
            join_info(info),
            category,
        )
    }
}

fn card_score(card: ElementRef<'_>, tooltip: &str) -> Option<String> {
    if let Some(rating) = card.select(&RATING).next() {
        return Some(element_text(rating));
    }

    let from_tooltip = [&*TOOLTIP_RATING, &*LABELLED_RATING, &*STAR_RATING]
        .iter()
        .find_map(|re| re.captures(tooltip))
        .map(|caps| caps[1].trim().to_string());
    if from_tooltip.is_some() {
        return from_tooltip;
    }

    let element = card.value();
    element
        .attr("data-rating")
        .or_else(|| element.attr("data-score"))
        .map(str::to_string)
}

fn card_info(card: ElementRef<'_>, tooltip: &str) -> Vec<String> {
    let bar: Vec<String> = card
        .select(&ENTRY_BAR)
        .take(ENTRY_BAR_ITEMS)
        .map(element_text)
        .collect();
    if bar.iter().any(|item| !item.is_empty()) {
        return bar;
    }

    [&*TOOLTIP_TYPE, &*TOOLTIP_YEAR]
        .iter()
        .filter_map(|re| re.captures(tooltip))
        .map(|caps| caps[1].trim().to_string())
        .collect()
}
