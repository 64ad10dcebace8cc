//! FILENAME: engine/src/table.rs
//! PURPOSE: Tabular snapshots and the run-scoped row model.
//! CONTEXT: A `Table` is what the data store returns for a named table: an
//! ordered header list plus rows sharing it. Merged rows are `Row` values over
//! a shared `Schema`, so column access is an index lookup rather than ad hoc
//! property access on a dynamic object.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

// ============================================================================
// TABLE
// ============================================================================

/// A snapshot of a source table. Immutable during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Table {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// A table with no columns, standing in for an unselected source.
    pub fn empty() -> Self {
        Table::default()
    }

    /// Position of a column in the header list (exact match).
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The value of `column` in row `row`. Short rows read as Empty.
    pub fn value(&self, row: usize, column: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or(CellValue::Empty)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// An ordered, de-duplicated set of column names with O(1) index lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Schema::default();
        for name in names {
            schema.push(name.into());
        }
        schema
    }

    /// Union of several header lists, in first-seen order.
    pub fn union<'a, I>(header_lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut schema = Schema::default();
        for headers in header_lists {
            for name in headers {
                schema.push(name.clone());
            }
        }
        schema
    }

    /// Appends a column if it is not present yet. Returns its index either way.
    pub fn push(&mut self, name: String) -> usize {
        if let Some(&idx) = self.index.get(&name) {
            return idx;
        }
        let idx = self.names.len();
        self.index.insert(name.clone(), idx);
        self.names.push(name);
        idx
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ============================================================================
// ROW
// ============================================================================

/// One merged row: a value per schema column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<CellValue>,
}

impl Row {
    /// A row with every column Empty.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![CellValue::Empty; schema.len()];
        Row { schema, values }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// None when the column is not part of the schema.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.schema.index_of(column).map(|idx| &self.values[idx])
    }

    /// Overwrites a column. Columns outside the schema are ignored and reported as false.
    pub fn set(&mut self, column: &str, value: CellValue) -> bool {
        match self.schema.index_of(column) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Trimmed key text of a column, "" when absent.
    pub fn key_text(&self, column: &str) -> String {
        self.get(column).map(CellValue::key_text).unwrap_or_default()
    }

    /// Values restricted to `columns`, in that order. Missing columns read as Empty.
    pub fn project(&self, columns: &[String]) -> Vec<CellValue> {
        columns
            .iter()
            .map(|c| self.get(c).cloned().unwrap_or(CellValue::Empty))
            .collect()
    }
}
