//! Text helpers used by both the merge step and the analyzer.
//!
//! Title matching across sources depends on these staying identical in both
//! places, so they live here rather than in either crate.

use crate::models::NOT_AVAILABLE;
use once_cell::sync::Lazy;
use regex::Regex;

/// Lowest and highest valid score
pub const SCORE_RANGE: (f64, f64) = (0.0, 10.0);

static SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]*)?").expect("valid regex"));
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Normalize a title for grouping and cross-source matching.
///
/// Lower-cases, drops every character that is neither a word character nor
/// whitespace, then collapses whitespace runs. "N/A" and blank titles
/// normalize to the empty string.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        return String::new();
    }

    let lowered = trimmed.to_lowercase();
    let kept = NON_WORD.replace_all(&lowered, "");
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First decimal-looking substring, with any trailing '.' dropped
fn score_text(text: &str) -> Option<&str> {
    SCORE.find(text).map(|m| m.as_str().trim_end_matches('.'))
}

/// Find the first decimal-looking substring and parse it.
///
/// `"9.73 (3700)"` -> `Some(9.73)`, `"N/A"` -> `None`.
pub fn parse_score(text: &str) -> Option<f64> {
    score_text(text)?.parse().ok()
}

/// Score used for ordering: absent or unparsable scores sort as 0.0
pub fn sort_score(text: &str) -> f64 {
    parse_score(text).unwrap_or(0.0)
}

/// Reduce raw score text to a clean decimal string in range, or "N/A"
pub fn normalize_score(raw: &str) -> String {
    match score_text(raw) {
        Some(text) if text.parse::<f64>().map(in_score_range).unwrap_or(false) => text.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn in_score_range(value: f64) -> bool {
    value >= SCORE_RANGE.0 && value <= SCORE_RANGE.1
}

/// Lower-cased word tokens of a title
pub fn title_words(title: &str) -> Vec<String> {
    WORD.find_iter(&title.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}
