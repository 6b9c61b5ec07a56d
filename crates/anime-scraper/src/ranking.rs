//! Merge records pooled from several queries into one ranked list.

use shared::text::{normalize_title, parse_score, sort_score};
use shared::AnimeRecord;
use std::collections::HashMap;
use tracing::debug;

/// Deduplicate by normalized title, order by score and keep the top `limit`.
///
/// When a title appears more than once, the record with the higher parsed
/// score is kept; a missing score loses to any parsed one and ties keep the
/// record seen first. The sort is stable, so equal scores stay in arrival
/// order. Ranks are reassigned 1..N and every record gets `category_label`.
pub fn merge(records: Vec<AnimeRecord>, limit: usize, category_label: &str) -> Vec<AnimeRecord> {
    let pooled = records.len();
    let mut kept: Vec<AnimeRecord> = Vec::with_capacity(pooled);
    let mut index_by_title: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = dedup_key(&record.title);
        match index_by_title.get(&key) {
            Some(&existing) => {
                if outranks(&record, &kept[existing]) {
                    kept[existing] = record;
                }
            }
            None => {
                index_by_title.insert(key, kept.len());
                kept.push(record);
            }
        }
    }

    let unique = kept.len();
    kept.sort_by(|a, b| sort_score(&b.score).total_cmp(&sort_score(&a.score)));
    kept.truncate(limit);

    for (index, record) in kept.iter_mut().enumerate() {
        record.rank = index as u32 + 1;
        record.category = category_label.to_string();
    }

    debug!(
        category = %category_label,
        pooled = pooled,
        unique = unique,
        kept = kept.len(),
        "Merged records"
    );
    kept
}

/// Grouping key; titles that normalize to nothing fall back to their raw form
fn dedup_key(title: &str) -> String {
    let normalized = normalize_title(title);
    if normalized.is_empty() {
        title.trim().to_lowercase()
    } else {
        normalized
    }
}

fn outranks(candidate: &AnimeRecord, current: &AnimeRecord) -> bool {
    match (parse_score(&candidate.score), parse_score(&current.score)) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        _ => false,
    }
}
