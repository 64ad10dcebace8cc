//! FILENAME: merge-engine/src/cache.rs
//! PURPOSE: Memoized lookups that live as long as the current source selection.
//! CONTEXT: Filter pickers ask for the unique values of a column and the
//! calling surface asks for the sheet/table/column tree. Both are cached until
//! the selection changes. Unique values are keyed by (table, column) so the
//! same column name in two tables never shares an entry.

use rustc_hash::FxHashMap;

use crate::definition::{RunConfig, TableRef};
use crate::logging::{log_debug, CAT_CACHE};

// ============================================================================
// WORKBOOK SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub name: String,
    pub tables: Vec<TableSnapshot>,
}

/// Sheets -> tables -> columns, as listed by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookSnapshot {
    pub sheets: Vec<SheetSnapshot>,
}

impl WorkbookSnapshot {
    pub fn sheet(&self, name: &str) -> Option<&SheetSnapshot> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn columns(&self, table: &TableRef) -> Option<&[String]> {
        self.sheet(&table.sheet)?
            .tables
            .iter()
            .find(|t| t.name == table.table)
            .map(|t| t.columns.as_slice())
    }
}

// ============================================================================
// SELECTION CACHE
// ============================================================================

/// The parts of a selection that decide what cached data means.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceFingerprint {
    tables: Vec<TableRef>,
    join_columns: Vec<String>,
}

impl SourceFingerprint {
    fn of(config: &RunConfig) -> Self {
        let mut join_columns = vec![
            config.join.result_column.clone(),
            config.join.other_column.clone(),
        ];
        for ext in &config.extensions {
            join_columns.push(ext.join.result_column.clone());
            join_columns.push(ext.join.other_column.clone());
        }
        SourceFingerprint {
            tables: config.source_tables().cloned().collect(),
            join_columns,
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectionCache {
    unique_values: FxHashMap<(TableRef, String), Vec<String>>,
    snapshot: Option<WorkbookSnapshot>,
    fingerprint: Option<SourceFingerprint>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current selection. Clears everything when the source
    /// tables or join columns differ from the last observed selection.
    /// Returns true when the cache was invalidated.
    pub fn observe(&mut self, config: &RunConfig) -> bool {
        let fingerprint = SourceFingerprint::of(config);
        let changed = self
            .fingerprint
            .as_ref()
            .is_some_and(|previous| *previous != fingerprint);
        if changed {
            log_debug!(CAT_CACHE, "source selection changed, dropping cached values");
            self.clear();
        }
        self.fingerprint = Some(fingerprint);
        changed
    }

    pub fn unique_values(&self, table: &TableRef, column: &str) -> Option<&[String]> {
        self.unique_values
            .get(&(table.clone(), column.to_string()))
            .map(Vec::as_slice)
    }

    pub fn store_unique_values(&mut self, table: &TableRef, column: &str, values: Vec<String>) {
        self.unique_values
            .insert((table.clone(), column.to_string()), values);
    }

    pub fn snapshot(&self) -> Option<&WorkbookSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn store_snapshot(&mut self, snapshot: WorkbookSnapshot) {
        self.snapshot = Some(snapshot);
    }

    /// Drops every entry that belongs to `table`, plus the snapshot.
    pub fn invalidate_table(&mut self, table: &TableRef) {
        self.unique_values.retain(|(t, _), _| t != table);
        self.snapshot = None;
        log_debug!(CAT_CACHE, "invalidated {}", table);
    }

    /// Drops the workbook snapshot only, e.g. after sheets or tables were added.
    pub fn invalidate_snapshot(&mut self) {
        self.snapshot = None;
    }

    pub fn invalidate_all(&mut self) {
        self.clear();
        self.fingerprint = None;
        log_debug!(CAT_CACHE, "invalidated all entries");
    }

    pub fn len(&self) -> usize {
        self.unique_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_values.is_empty() && self.snapshot.is_none()
    }

    fn clear(&mut self) {
        self.unique_values.clear();
        self.snapshot = None;
    }
}
