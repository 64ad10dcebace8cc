//! FILENAME: persistence/src/lib.rs
//! Persistence Module
//!
//! Holds the in-memory workbook the merge pipeline runs against and saves or
//! loads it in XLSX format. `Workbook` implements `TabularDataStore`.

mod error;
mod store;
mod xlsx_reader;
mod xlsx_writer;

pub use error::PersistenceError;
pub use xlsx_reader::load_xlsx;
pub use xlsx_writer::save_xlsx;

use engine::{parse_range, CellCoord, CellRange, CellValue, Grid};
use merge_engine::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// METADATA SHEET NAME (used for persisting table and format data in XLSX)
// ============================================================================

/// Hidden metadata sheet holding tables and number formats as JSON.
/// This sheet is filtered out during load and written during save.
pub const META_SHEET_NAME: &str = "_merge_meta";

// ============================================================================
// WORKBOOK
// ============================================================================

/// Represents a complete workbook that can be saved/loaded
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    /// Table definitions across all sheets (serialized as JSON in metadata sheet)
    pub tables: Vec<SavedTable>,
    pub defined_names: Vec<DefinedName>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of a sheet by name. Sheet names compare case-insensitively.
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheet_index(name).map(|i| &self.sheets[i])
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheet_index(name).map(move |i| &mut self.sheets[i])
    }

    /// Adds a sheet, or returns the index of the existing one.
    pub fn add_sheet(&mut self, name: &str) -> usize {
        match self.sheet_index(name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet::new(name.to_string()));
                self.sheets.len() - 1
            }
        }
    }

    /// Table names are unique across the workbook and compare case-insensitively.
    pub fn table(&self, name: &str) -> Option<&SavedTable> {
        self.table_position(name).map(|i| &self.tables[i])
    }

    fn table_position(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn tables_on(&self, sheet_index: usize) -> impl Iterator<Item = &SavedTable> {
        self.tables.iter().filter(move |t| t.sheet_index == sheet_index)
    }

    /// Writes `headers` and `rows` at `origin` on `sheet` (created if missing)
    /// and registers them as a table.
    pub fn add_table(
        &mut self,
        sheet: &str,
        name: &str,
        origin: CellCoord,
        headers: &[&str],
        rows: Vec<Vec<CellValue>>,
    ) -> StoreResult<()> {
        let sheet_index = self.add_sheet(sheet);
        let range = CellRange::from_origin(origin, rows.len() as u32 + 1, headers.len() as u32);
        self.check_table(sheet_index, &range, name)?;

        let mut block = vec![headers.iter().map(|h| CellValue::text(*h)).collect::<Vec<_>>()];
        block.extend(rows);
        self.sheets[sheet_index].grid.write_block(origin, &block);

        self.tables.push(SavedTable {
            name: name.to_string(),
            sheet_index,
            start_row: range.start.0,
            start_col: range.start.1,
            end_row: range.end.0,
            end_col: range.end.1,
            columns: headers.iter().map(|h| h.to_string()).collect(),
            has_headers: true,
        });
        Ok(())
    }

    /// Applies `format` to every data body cell of `column` in table `table`.
    pub fn set_column_format(
        &mut self,
        table: &str,
        column: &str,
        format: &str,
    ) -> StoreResult<()> {
        let saved = self
            .table(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let col = saved
            .column_index(column)
            .ok_or_else(|| StoreError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        let (sheet_index, first, last) = (saved.sheet_index, saved.data_start_row(), saved.end_row);

        let grid = &mut self.sheets[sheet_index].grid;
        for row in first..=last {
            grid.set_number_format(row, col, format);
        }
        Ok(())
    }

    /// Defines (or redefines) a workbook-scoped name over `address` on `sheet`.
    pub fn define_name(&mut self, name: &str, sheet: &str, address: &str) -> StoreResult<()> {
        if self.sheet_index(sheet).is_none() {
            return Err(StoreError::SheetNotFound(sheet.to_string()));
        }
        let parsed =
            parse_range(address).ok_or_else(|| StoreError::InvalidRange(address.to_string()))?;

        self.defined_names
            .retain(|n| !n.name.eq_ignore_ascii_case(name));
        self.defined_names.push(DefinedName {
            name: name.to_string(),
            sheet: sheet.to_string(),
            range: parsed.range,
        });
        Ok(())
    }

    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.defined_names
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    /// Rejects an empty or taken name and ranges overlapping another table
    /// on the same sheet.
    fn check_table(&self, sheet_index: usize, range: &CellRange, name: &str) -> StoreResult<()> {
        if name.trim().is_empty() {
            return Err(StoreError::Conflict("table name cannot be empty".to_string()));
        }
        if self.table_position(name).is_some() {
            return Err(StoreError::Conflict(format!("a table named '{}' already exists", name)));
        }
        if let Some(other) = self
            .tables_on(sheet_index)
            .find(|t| t.range().overlaps(range))
        {
            return Err(StoreError::Conflict(format!(
                "range {} overlaps table '{}'",
                range, other.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SHEET
// ============================================================================

/// Represents a single worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
    /// Column widths in pixels.
    pub column_widths: HashMap<u32, f64>,
}

impl Sheet {
    pub fn new(name: String) -> Self {
        Sheet {
            name,
            grid: Grid::new(),
            column_widths: HashMap::new(),
        }
    }
}

// ============================================================================
// TABLES, NAMES AND FORMATS
// ============================================================================

/// Serializable table definition. Rows and columns are 0-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTable {
    pub name: String,
    pub sheet_index: usize,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
    pub columns: Vec<String>,
    pub has_headers: bool,
}

impl SavedTable {
    pub fn range(&self) -> CellRange {
        CellRange::new((self.start_row, self.start_col), (self.end_row, self.end_col))
    }

    /// First data body row. Past `end_row` when the table has no body.
    pub fn data_start_row(&self) -> u32 {
        self.start_row + u32::from(self.has_headers)
    }

    /// Absolute sheet column of a table column.
    pub fn column_index(&self, column: &str) -> Option<u32> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.start_col + i as u32)
    }
}

/// A workbook-scoped defined name.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedName {
    pub name: String,
    pub sheet: String,
    pub range: CellRange,
}

/// A number format applied to one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFormat {
    pub sheet_index: usize,
    pub row: u32,
    pub col: u32,
    pub format: String,
}

/// Metadata structure stored as JSON in the hidden metadata sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookMeta {
    pub version: u32,
    pub tables: Vec<SavedTable>,
    pub number_formats: Vec<SavedFormat>,
}

impl WorkbookMeta {
    pub fn from_workbook(workbook: &Workbook) -> Self {
        let mut number_formats = Vec::new();
        for (sheet_index, sheet) in workbook.sheets.iter().enumerate() {
            for (&(row, col), cell) in &sheet.grid.cells {
                if let Some(format) = &cell.number_format {
                    number_formats.push(SavedFormat {
                        sheet_index,
                        row,
                        col,
                        format: format.clone(),
                    });
                }
            }
        }
        number_formats.sort_by_key(|f| (f.sheet_index, f.row, f.col));

        WorkbookMeta {
            version: 1,
            tables: workbook.tables.clone(),
            number_formats,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff_workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_table(
            "People",
            "Staff",
            (1, 1),
            &["ID", "Amount"],
            vec![
                vec![CellValue::Number(1.0), CellValue::Number(10.0)],
                vec![CellValue::Number(2.0), CellValue::Number(20.0)],
            ],
        )
        .unwrap();
        wb
    }

    #[test]
    fn test_add_table_writes_cells_and_registers_range() {
        let wb = staff_workbook();
        let table = wb.table("staff").unwrap();
        assert_eq!(table.range(), CellRange::new((1, 1), (3, 2)));
        assert_eq!(table.data_start_row(), 2);
        assert_eq!(table.column_index("Amount"), Some(2));
        assert_eq!(wb.sheets[0].grid.value_at(3, 2), CellValue::Number(20.0));
    }

    #[test]
    fn test_add_table_rejects_duplicates_and_overlaps() {
        let mut wb = staff_workbook();
        let dup = wb.add_table("People", "STAFF", (10, 0), &["A"], Vec::new());
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        let overlap = wb.add_table("People", "Other", (3, 0), &["A", "B"], Vec::new());
        assert!(matches!(overlap, Err(StoreError::Conflict(_))));

        // Same range on another sheet is fine
        wb.add_table("Other", "Other", (3, 0), &["A", "B"], Vec::new()).unwrap();
    }

    #[test]
    fn test_set_column_format_covers_data_body_only() {
        let mut wb = staff_workbook();
        wb.set_column_format("Staff", "Amount", "0.00").unwrap();
        let grid = &wb.sheets[0].grid;
        assert!(grid.get_cell(1, 2).unwrap().number_format.is_none());
        assert_eq!(grid.get_cell(3, 2).unwrap().number_format.as_deref(), Some("0.00"));
    }

    #[test]
    fn test_define_name_replaces_existing() {
        let mut wb = staff_workbook();
        wb.define_name("HeaderTemplate", "People", "A1:B2").unwrap();
        wb.define_name("headertemplate", "People", "$C$1").unwrap();
        assert_eq!(wb.defined_names.len(), 1);
        assert_eq!(
            wb.defined_name("HeaderTemplate").unwrap().range,
            CellRange::new((0, 2), (0, 2))
        );
        assert!(matches!(
            wb.define_name("X", "Missing", "A1"),
            Err(StoreError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_meta_collects_formats_in_order() {
        let mut wb = staff_workbook();
        wb.set_column_format("Staff", "ID", "0").unwrap();
        let meta = WorkbookMeta::from_workbook(&wb);
        assert_eq!(meta.tables.len(), 1);
        assert_eq!(meta.number_formats.len(), 2);
        assert_eq!(meta.number_formats[0].row, 2);

        let restored = WorkbookMeta::from_json(&meta.to_json().unwrap()).unwrap();
        assert_eq!(restored, meta);
    }
}
