//! Cross-source analysis of the combined scrape results.
//!
//! Reads `all_anime_data_combined.json`, finds titles listed by more than one
//! site, and summarizes scores, categories and title wording. The analysis
//! itself never touches the network or the cache.

pub mod analysis;
pub mod report;

pub use analysis::analyze;
pub use report::{
    load_combined, write_common_csv, write_report, AnalysisReport, CommonTitle, Occurrence,
};
