//! Near-miss column suggestions for fields that could not be resolved.

use std::cmp::Ordering;

use rapidfuzz::distance::jaro_winkler::similarity as jaro_similarity;

/// Minimum Jaro-Winkler similarity for a column to be suggested.
pub const SUGGESTION_THRESHOLD: f64 = 0.80;
/// Maximum number of suggestions per field.
pub const MAX_SUGGESTIONS: usize = 3;

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ranks `columns` by their best similarity to any of `names`.
///
/// Suggestions are informational only and never used for resolution.
pub fn suggest_columns<N, C>(names: &[N], columns: &[C]) -> Vec<String>
where
    N: AsRef<str>,
    C: AsRef<str>,
{
    let names: Vec<String> = names.iter().map(|n| normalize_text(n.as_ref())).collect();
    let mut scored: Vec<(f64, &str)> = columns
        .iter()
        .filter_map(|column| {
            let column: &str = column.as_ref();
            let normalized = normalize_text(column);
            let best = names
                .iter()
                .map(|name| jaro_similarity(name.chars(), normalized.chars()))
                .fold(0.0_f64, f64::max);
            (best >= SUGGESTION_THRESHOLD).then_some((best, column))
        })
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, column)| column.to_string())
        .collect()
}
