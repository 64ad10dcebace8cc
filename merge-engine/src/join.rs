//! FILENAME: merge-engine/src/join.rs
//! PURPOSE: Join Resolver - merges secondary and extension tables into primary rows.
//! CONTEXT: Every non-primary table gets one lookup index keyed by the trimmed
//! text of its join column. Each filtered primary row then becomes a `Row`
//! over the union schema: primary values first, the matched secondary row
//! overlaid on top, then each extension in configured order. An extension's
//! key is read from the row as merged so far, so it can join on a column that
//! the secondary table or an earlier extension contributed.
//!
//! Duplicate keys inside one table resolve last-write-wins.

use std::sync::Arc;

use engine::{CellValue, Row, Schema, Table};
use rustc_hash::FxHashMap;

use crate::definition::JoinSpec;
use crate::logging::{log_debug, log_warn, CAT_JOIN};

// ============================================================================
// LOOKUP INDEX
// ============================================================================

/// Trimmed join value -> row of one table.
#[derive(Debug)]
pub struct LookupIndex<'a> {
    table: &'a Table,
    by_key: FxHashMap<String, usize>,
    duplicate_keys: usize,
}

impl<'a> LookupIndex<'a> {
    /// Indexes `table` on `join_column`. A missing column yields an index
    /// where every lookup misses.
    pub fn build(table: &'a Table, join_column: &str) -> Self {
        let mut by_key = FxHashMap::default();
        let mut duplicate_keys = 0;

        if let Some(col) = table.column_index(join_column) {
            by_key.reserve(table.rows.len());
            for (idx, row) in table.rows.iter().enumerate() {
                let key = row.get(col).map(CellValue::key_text).unwrap_or_default();
                if by_key.insert(key, idx).is_some() {
                    duplicate_keys += 1;
                }
            }
        }

        if duplicate_keys > 0 {
            log_warn!(
                CAT_JOIN,
                "table '{}': {} duplicate key(s) on '{}', last row wins",
                table.name,
                duplicate_keys,
                join_column
            );
        }

        LookupIndex {
            table,
            by_key,
            duplicate_keys,
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a [CellValue]> {
        self.by_key
            .get(key)
            .and_then(|&idx| self.table.rows.get(idx))
            .map(Vec::as_slice)
    }

    /// Number of rows whose key overwrote an earlier row's.
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// ============================================================================
// MERGE
// ============================================================================

/// A non-primary table and how it joins.
#[derive(Debug, Clone, Copy)]
pub struct JoinSource<'a> {
    pub table: &'a Table,
    pub join: &'a JoinSpec,
}

/// The merged rows of a run, all sharing one schema.
#[derive(Debug, Clone)]
pub struct MergedRows {
    pub schema: Arc<Schema>,
    pub rows: Vec<Row>,
}

/// Joins the filtered primary rows with the secondary table and every extension.
pub fn merge_rows(
    primary: &Table,
    primary_rows: &[&[CellValue]],
    secondary: JoinSource<'_>,
    extensions: &[JoinSource<'_>],
) -> MergedRows {
    let schema = Arc::new(Schema::union(
        std::iter::once(primary.headers.as_slice())
            .chain(std::iter::once(secondary.table.headers.as_slice()))
            .chain(extensions.iter().map(|e| e.table.headers.as_slice())),
    ));

    let secondary_index = LookupIndex::build(secondary.table, &secondary.join.other_column);
    let extension_indices: Vec<LookupIndex<'_>> = extensions
        .iter()
        .map(|e| LookupIndex::build(e.table, &e.join.other_column))
        .collect();

    let primary_key = primary.column_index(&secondary.join.result_column);

    let rows: Vec<Row> = primary_rows
        .iter()
        .map(|values| {
            let mut row = Row::new(schema.clone());
            overlay(&mut row, &primary.headers, Some(values));

            let key = primary_key
                .and_then(|i| values.get(i))
                .map(CellValue::key_text)
                .unwrap_or_default();
            overlay(&mut row, &secondary.table.headers, secondary_index.get(&key));

            for (ext, index) in extensions.iter().zip(&extension_indices) {
                let key = row.key_text(&ext.join.result_column);
                overlay(&mut row, &ext.table.headers, index.get(&key));
            }
            row
        })
        .collect();

    log_debug!(
        CAT_JOIN,
        "merged {} row(s) over {} column(s), {} extension(s)",
        rows.len(),
        schema.len(),
        extensions.len()
    );

    MergedRows { schema, rows }
}

/// Writes `headers` from `matched` into `row`; without a match every one becomes Empty.
fn overlay(row: &mut Row, headers: &[String], matched: Option<&[CellValue]>) {
    for (idx, column) in headers.iter().enumerate() {
        let value = matched
            .and_then(|values| values.get(idx))
            .cloned()
            .unwrap_or(CellValue::Empty);
        row.set(column, value);
    }
}

// ============================================================================
// NUMBER FORMATS
// ============================================================================

/// Column name -> number format, for one source table.
pub type ColumnFormats = FxHashMap<String, String>;

/// The format of each output column: the first non-empty format among
/// `sources` (primary, secondary, then extensions), else `default_format`.
pub fn resolve_column_formats(
    output_columns: &[String],
    sources: &[ColumnFormats],
    default_format: &str,
) -> Vec<String> {
    output_columns
        .iter()
        .map(|column| {
            sources
                .iter()
                .filter_map(|formats| formats.get(column))
                .find(|f| !f.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| default_format.to_string())
        })
        .collect()
}
