//! FILENAME: merge-engine/src/store.rs
//! PURPOSE: The tabular data store the merge pipeline reads from and writes to.
//! CONTEXT: Everything that touches sheets, tables or number formats goes
//! through this trait. Row and column arguments are 0-based; ranges are
//! inclusive `CellRange`s. Implementations live outside this crate (see the
//! persistence crate's `Workbook`).

use engine::{CellRange, CellValue, Table};

use crate::definition::TableRef;
use crate::error::StoreResult;

/// A resolved template block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateBlock {
    pub values: Vec<Vec<CellValue>>,
    pub row_count: u32,
    pub col_count: u32,
}

impl TemplateBlock {
    /// Builds a block, padding short rows with Empty so the block is rectangular.
    pub fn new(mut values: Vec<Vec<CellValue>>) -> Self {
        let col_count = values.iter().map(Vec::len).max().unwrap_or(0);
        for row in values.iter_mut() {
            row.resize(col_count, CellValue::Empty);
        }
        TemplateBlock {
            row_count: values.len() as u32,
            col_count: col_count as u32,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.col_count == 0
    }
}

/// A sheet the pipeline writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetHandle {
    pub name: String,
}

impl SheetHandle {
    pub fn new(name: impl Into<String>) -> Self {
        SheetHandle { name: name.into() }
    }
}

pub trait TabularDataStore {
    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    fn list_sheets(&self) -> StoreResult<Vec<String>>;

    fn list_tables(&self, sheet: &str) -> StoreResult<Vec<String>>;

    fn list_columns(&self, table: &TableRef) -> StoreResult<Vec<String>>;

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Headers plus data rows of a table.
    fn read_table(&self, table: &TableRef) -> StoreResult<Table>;

    /// The number format of a column's data body, None when unset.
    fn read_column_format(&self, table: &TableRef, column: &str) -> StoreResult<Option<String>>;

    /// The explicit `sheet` + `address` block when both are given, otherwise
    /// the block behind the defined name `named_region`. `Ok(None)` when
    /// neither resolves.
    fn resolve_template_range(
        &self,
        sheet: Option<&str>,
        address: Option<&str>,
        named_region: &str,
    ) -> StoreResult<Option<TemplateBlock>>;

    /// The used range of a sheet in A1 form without the sheet prefix.
    fn used_range_address(&self, sheet: &str) -> StoreResult<Option<String>>;

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Creates the sheet, or clears every cell and table on it if it exists.
    fn create_or_clear_sheet(&mut self, name: &str) -> StoreResult<SheetHandle>;

    fn write_block(
        &mut self,
        sheet: &SheetHandle,
        start_row: u32,
        start_col: u32,
        values: &[Vec<CellValue>],
    ) -> StoreResult<()>;

    /// Applies one format per column, starting at column 0, on a single row.
    fn set_column_formats(&mut self, sheet: &SheetHandle, row: u32, formats: &[String])
        -> StoreResult<()>;

    /// Registers a table over `range` and returns the name it was given.
    fn create_table(
        &mut self,
        sheet: &SheetHandle,
        range: CellRange,
        has_headers: bool,
        name: &str,
    ) -> StoreResult<String>;

    fn delete_table(&mut self, name: &str) -> StoreResult<()>;

    fn autofit_columns(&mut self, sheet: &SheetHandle) -> StoreResult<()>;
}
