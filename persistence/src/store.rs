//! FILENAME: persistence/src/store.rs
//! PURPOSE: `TabularDataStore` over the in-memory `Workbook`.
//! CONTEXT: This is the store the merge pipeline runs against in tests and
//! when a workbook is processed from disk. Table and sheet names compare
//! case-insensitively.

use engine::{parse_range, CellRange, CellValue, Table};
use merge_engine::{
    SheetHandle, StoreError, StoreResult, TableRef, TabularDataStore, TemplateBlock,
};

use crate::{SavedTable, Sheet, Workbook};

/// Pixels per character used by autofit.
const CHAR_WIDTH_PX: f64 = 7.0;
/// Narrowest autofit width, in characters.
const MIN_AUTOFIT_CHARS: usize = 4;
/// Extra characters of padding added by autofit.
const AUTOFIT_PADDING_CHARS: usize = 2;

impl Workbook {
    fn sheet_or_err(&self, name: &str) -> StoreResult<&Sheet> {
        self.sheet(name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut_or_err(&mut self, name: &str) -> StoreResult<&mut Sheet> {
        self.sheet_mut(name)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }

    /// The table behind `table`. A non-empty sheet must match the table's sheet.
    fn find_table(&self, table: &TableRef) -> StoreResult<&SavedTable> {
        let saved = self
            .table(&table.table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let on_sheet = table.sheet.is_empty()
            || self
                .sheets
                .get(saved.sheet_index)
                .is_some_and(|s| s.name.eq_ignore_ascii_case(&table.sheet));
        if on_sheet {
            Ok(saved)
        } else {
            Err(StoreError::TableNotFound(table.to_string()))
        }
    }
}

impl TabularDataStore for Workbook {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        Ok(self.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn list_tables(&self, sheet: &str) -> StoreResult<Vec<String>> {
        let index = self
            .sheet_index(sheet)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        Ok(self.tables_on(index).map(|t| t.name.clone()).collect())
    }

    fn list_columns(&self, table: &TableRef) -> StoreResult<Vec<String>> {
        Ok(self.find_table(table)?.columns.clone())
    }

    fn read_table(&self, table: &TableRef) -> StoreResult<Table> {
        let saved = self.find_table(table)?;
        let grid = &self.sheets[saved.sheet_index].grid;

        let rows = if saved.data_start_row() > saved.end_row {
            Vec::new()
        } else {
            grid.read_block(&CellRange::new(
                (saved.data_start_row(), saved.start_col),
                (saved.end_row, saved.end_col),
            ))
        };
        Ok(Table::new(saved.name.clone(), saved.columns.clone(), rows))
    }

    fn read_column_format(&self, table: &TableRef, column: &str) -> StoreResult<Option<String>> {
        let saved = self.find_table(table)?;
        let col = saved
            .column_index(column)
            .ok_or_else(|| StoreError::ColumnNotFound {
                table: saved.name.clone(),
                column: column.to_string(),
            })?;
        if saved.data_start_row() > saved.end_row {
            return Ok(None);
        }

        Ok(self.sheets[saved.sheet_index]
            .grid
            .get_cell(saved.data_start_row(), col)
            .and_then(|cell| cell.number_format.clone()))
    }

    fn resolve_template_range(
        &self,
        sheet: Option<&str>,
        address: Option<&str>,
        named_region: &str,
    ) -> StoreResult<Option<TemplateBlock>> {
        let explicit = match (sheet, address) {
            (Some(s), Some(a)) if !s.trim().is_empty() && !a.trim().is_empty() => Some((s, a)),
            _ => None,
        };

        let (grid, range) = match explicit {
            Some((sheet, address)) => {
                let grid = &self.sheet_or_err(sheet)?.grid;
                let parsed = parse_range(address)
                    .ok_or_else(|| StoreError::InvalidRange(address.to_string()))?;
                (grid, parsed.range)
            }
            None => match self.defined_name(named_region) {
                Some(name) => (&self.sheet_or_err(&name.sheet)?.grid, name.range),
                None => return Ok(None),
            },
        };

        Ok(Some(TemplateBlock::new(grid.read_block(&range))))
    }

    fn used_range_address(&self, sheet: &str) -> StoreResult<Option<String>> {
        Ok(self
            .sheet_or_err(sheet)?
            .grid
            .used_range()
            .map(|range| range.to_a1()))
    }

    fn create_or_clear_sheet(&mut self, name: &str) -> StoreResult<SheetHandle> {
        let index = match self.sheet_index(name) {
            Some(index) => {
                let sheet = &mut self.sheets[index];
                sheet.grid.clear();
                sheet.column_widths.clear();
                self.tables.retain(|t| t.sheet_index != index);
                index
            }
            None => self.add_sheet(name),
        };
        Ok(SheetHandle::new(self.sheets[index].name.clone()))
    }

    fn write_block(
        &mut self,
        sheet: &SheetHandle,
        start_row: u32,
        start_col: u32,
        values: &[Vec<CellValue>],
    ) -> StoreResult<()> {
        self.sheet_mut_or_err(&sheet.name)?
            .grid
            .write_block((start_row, start_col), values);
        Ok(())
    }

    fn set_column_formats(
        &mut self,
        sheet: &SheetHandle,
        row: u32,
        formats: &[String],
    ) -> StoreResult<()> {
        let grid = &mut self.sheet_mut_or_err(&sheet.name)?.grid;
        for (col, format) in formats.iter().enumerate() {
            grid.set_number_format(row, col as u32, format);
        }
        Ok(())
    }

    fn create_table(
        &mut self,
        sheet: &SheetHandle,
        range: CellRange,
        has_headers: bool,
        name: &str,
    ) -> StoreResult<String> {
        let sheet_index = self
            .sheet_index(&sheet.name)
            .ok_or_else(|| StoreError::SheetNotFound(sheet.name.clone()))?;
        self.check_table(sheet_index, &range, name)?;

        let columns: Vec<String> = if has_headers {
            let grid = &self.sheets[sheet_index].grid;
            (range.start.1..=range.end.1)
                .map(|col| grid.value_at(range.start.0, col).display_value())
                .collect()
        } else {
            (1..=range.col_count()).map(|i| format!("Column{}", i)).collect()
        };

        self.tables.push(SavedTable {
            name: name.to_string(),
            sheet_index,
            start_row: range.start.0,
            start_col: range.start.1,
            end_row: range.end.0,
            end_col: range.end.1,
            columns,
            has_headers,
        });
        Ok(name.to_string())
    }

    /// Removes the table and clears its cells.
    fn delete_table(&mut self, name: &str) -> StoreResult<()> {
        let position = self
            .table_position(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        let table = self.tables.remove(position);

        self.sheets[table.sheet_index].grid.clear_range(&table.range());
        Ok(())
    }

    fn autofit_columns(&mut self, sheet: &SheetHandle) -> StoreResult<()> {
        let sheet = self.sheet_mut_or_err(&sheet.name)?;
        for (col, chars) in sheet.grid.column_text_widths() {
            let width =
                (chars.max(MIN_AUTOFIT_CHARS) + AUTOFIT_PADDING_CHARS) as f64 * CHAR_WIDTH_PX;
            sheet.column_widths.insert(col, width);
        }
        Ok(())
    }
}
