//! FILENAME: merge-engine/src/columns.rs
//! PURPOSE: Output column order and group-by column bookkeeping.
//! CONTEXT: The calling surface keeps a user-arranged output order and a
//! group-by selection while sources and column picks change underneath them.
//! These helpers bring both back in line with the current selection.

use std::collections::HashSet;

/// Keeps `current` order for columns still selected, then appends newly
/// selected columns in selection order. Duplicates are dropped.
pub fn reconcile_output_order(current: &[String], selected: &[String]) -> Vec<String> {
    let selected_set: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(selected.len());

    for column in current.iter().chain(selected) {
        if selected_set.contains(column.as_str()) && seen.insert(column.as_str()) {
            order.push(column.clone());
        }
    }
    order
}

/// Selection order: primary picks, secondary picks, then each extension's picks.
pub fn default_output_order(
    primary: &[String],
    secondary: &[String],
    extensions: &[Vec<String>],
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    primary
        .iter()
        .chain(secondary)
        .chain(extensions.iter().flatten())
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

/// Every header of every source, de-duplicated, in first-seen order.
pub fn group_by_candidates(
    primary: &[String],
    secondary: &[String],
    extensions: &[Vec<String>],
) -> Vec<String> {
    default_output_order(primary, secondary, extensions)
}

/// Drops group-by selections that are no longer candidates. When nothing is
/// left, defaults to the primary join column if it is a candidate.
pub fn reconcile_group_by(
    selected: &[String],
    candidates: &[String],
    primary_join: Option<&str>,
) -> Vec<String> {
    let mut kept: Vec<String> = selected
        .iter()
        .filter(|c| candidates.contains(c))
        .cloned()
        .collect();

    if kept.is_empty() {
        if let Some(join) = primary_join.filter(|j| candidates.iter().any(|c| c == j)) {
            kept.push(join.to_string());
        }
    }
    kept
}
