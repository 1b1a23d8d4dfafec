//! Header label normalization.
//!
//! Turns raw labels into unique, stable column keys: the `*` required marker is
//! factored out, blank labels become `empty`, and repeats get `_N` suffixes in
//! order of appearance. Matching is exact and case-sensitive.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::cell::{Row, cell_at, max_width};

pub const REQUIRED_MARKER: char = '*';
pub const BLANK_LABEL: &str = "empty";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLabel {
    pub key: String,
    /// The raw label carried the required marker.
    pub required: bool,
}

/// Removes one trailing (or, failing that, leading) required marker.
pub fn strip_required_marker(label: &str) -> (&str, bool) {
    let trimmed = label.trim();
    if let Some(stripped) = trimmed.strip_suffix(REQUIRED_MARKER) {
        (stripped.trim_end(), true)
    } else if let Some(stripped) = trimmed.strip_prefix(REQUIRED_MARKER) {
        (stripped.trim_start(), true)
    } else {
        (trimmed, false)
    }
}

pub fn normalize_labels<S: AsRef<str>>(labels: &[S]) -> Vec<NormalizedLabel> {
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut emitted: HashSet<String> = HashSet::with_capacity(labels.len());

    labels
        .iter()
        .map(|label| {
            let (cleaned, required) = strip_required_marker(label.as_ref());
            let cleaned = if cleaned.is_empty() {
                BLANK_LABEL
            } else {
                cleaned
            };
            let seen = occurrences.entry(cleaned.to_string()).or_insert(0);
            let mut key = if *seen == 0 {
                cleaned.to_string()
            } else {
                format!("{cleaned}_{seen}")
            };
            // A suffixed key can collide with a literal label such as "a_1".
            while emitted.contains(&key) {
                *seen += 1;
                key = format!("{cleaned}_{seen}");
            }
            *seen += 1;
            emitted.insert(key.clone());
            NormalizedLabel { key, required }
        })
        .collect()
}

pub fn normalize<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    normalize_labels(labels)
        .into_iter()
        .map(|label| label.key)
        .collect()
}

/// Flattens one or more header rows into one raw label per column.
///
/// Non-blank parts are joined top to bottom with `separator`; a part equal to
/// the one above it is dropped so a parent spanning a single column does not
/// repeat itself.
pub fn header_labels(header_rows: &[Row], separator: &str) -> Vec<String> {
    let width = max_width(header_rows);
    (0..width)
        .map(|col| {
            header_rows
                .iter()
                .map(|row| cell_at(row, col).as_text().trim().to_string())
                .filter(|part| !part.is_empty())
                .dedup()
                .join(separator)
        })
        .collect()
}
