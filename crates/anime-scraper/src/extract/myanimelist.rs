//! MyAnimeList ranking tables (`topanime.php`), with the seasonal and genre
//! card layouts as fallbacks.

use super::{
    build_record, css, element_lines, element_text, find_first, find_with_text, join_info,
    resolve_url, select_first_chain, ListExtractor,
};
use crate::error::Result;
use crate::source::Source;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use shared::AnimeRecord;

static RANKING_ROW: Lazy<Selector> = Lazy::new(|| css("tr.ranking-list"));
static CATEGORY_CARD: Lazy<Selector> = Lazy::new(|| css("div.js-anime-category-producer"));
static SEASONAL_CARD: Lazy<Selector> = Lazy::new(|| css("div.seasonal-anime"));

static RANKING_TITLE: Lazy<Selector> = Lazy::new(|| css("h3.anime_ranking_h3 a"));
static LINK_TITLE: Lazy<Selector> = Lazy::new(|| css("a.link-title"));
static HOVER_LINK: Lazy<Selector> = Lazy::new(|| css("a.hoverinfo_trigger"));
static ANIME_LINK: Lazy<Selector> = Lazy::new(|| css("a[href*=\"/anime/\"]"));

static RANK_CELL: Lazy<Selector> = Lazy::new(|| css("td.rank span"));
static RANK_SPAN: Lazy<Selector> = Lazy::new(|| css("span.rank"));

static SCORE_CELL: Lazy<Selector> = Lazy::new(|| css("td.score span.score-label"));
static SCORE_LABEL: Lazy<Selector> = Lazy::new(|| css("span.score-label"));
static SCORE_DIV: Lazy<Selector> = Lazy::new(|| css("div.score"));
static SCORE_SPAN: Lazy<Selector> = Lazy::new(|| css("span.score"));

static INFORMATION: Lazy<Selector> = Lazy::new(|| css("div.information"));
static PRODSRC: Lazy<Selector> = Lazy::new(|| css("div.prodsrc"));

/// MyAnimeList listing extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct MyAnimeListExtractor;

impl ListExtractor for MyAnimeListExtractor {
    fn source(&self) -> Source {
        Source::MyAnimeList
    }

    fn entries<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        select_first_chain(document, &[&*RANKING_ROW, &*CATEGORY_CARD, &*SEASONAL_CARD])
    }

    fn extract_entry(
        &self,
        entry: ElementRef<'_>,
        position: usize,
        category: &str,
    ) -> Result<AnimeRecord> {
        let link = find_with_text(
            entry,
            &[&*RANKING_TITLE, &*LINK_TITLE, &*HOVER_LINK, &*ANIME_LINK],
        );
        let title = link.map(element_text).unwrap_or_default();
        let url = resolve_url(
            Source::MyAnimeList.base_url(),
            link.and_then(|a| a.value().attr("href")),
        );

        // Ranking tables print the rank; cards do not
        let rank = find_first(entry, &[&*RANK_CELL, &*RANK_SPAN])
            .and_then(|el| element_text(el).trim_start_matches('#').parse::<u32>().ok())
            .unwrap_or(position as u32);

        let score = find_first(entry, &[&*SCORE_CELL, &*SCORE_LABEL, &*SCORE_DIV, &*SCORE_SPAN])
            .map(element_text);

        let info = find_first(entry, &[&*INFORMATION, &*PRODSRC])
            .map(element_lines)
            .unwrap_or_default();

        build_record(
            Source::MyAnimeList,
            rank,
            title,
            score.as_deref(),
            url,
            join_info(info),
            category,
        )
    }
}
