//! FILENAME: merge-engine/src/filter.rs
//! PURPOSE: Row Filter - keeps primary rows matching every active filter.
//! CONTEXT: Comparison is on trimmed, lower-cased text on both sides. A filter
//! naming a column the primary table lacks matches nothing here; the validator
//! reports it before anything is written.

use engine::{CellValue, Table};

use crate::definition::Filter;

/// Normalized comparison form of a cell or filter value.
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Rows of `table` that satisfy all active filters, in source order.
pub fn filter_rows<'a>(table: &'a Table, filters: &[Filter]) -> Vec<&'a [CellValue]> {
    let active: Vec<(Option<usize>, String)> = filters
        .iter()
        .filter(|f| f.is_active())
        .map(|f| (table.column_index(&f.column), normalize(&f.value)))
        .collect();

    table
        .rows
        .iter()
        .filter(|row| {
            active.iter().all(|(idx, wanted)| match idx {
                Some(i) => {
                    let value = row.get(*i).map(CellValue::key_text).unwrap_or_default();
                    normalize(&value) == *wanted
                }
                None => false,
            })
        })
        .map(Vec::as_slice)
        .collect()
}
