//! FILENAME: persistence/src/xlsx_writer.rs

use crate::{PersistenceError, SavedTable, Workbook, WorkbookMeta, META_SHEET_NAME};
use engine::{index_to_col, CellRange, CellValue};
use rust_xlsxwriter::{Format, Table, TableColumn, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;

/// Excel caps a cell's text length; the metadata JSON is split across rows.
const META_CHUNK_CHARS: usize = 32_000;

/// The format Excel applies when none is set.
const GENERAL_FORMAT: &str = "General";

pub fn save_xlsx(workbook: &Workbook, path: &Path) -> Result<(), PersistenceError> {
    if workbook.sheets.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let mut xlsx = XlsxWorkbook::new();

    for (sheet_index, sheet) in workbook.sheets.iter().enumerate() {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        // Set column widths (Excel uses character width, roughly pixels / 7)
        for (col, width) in &sheet.column_widths {
            let excel_width = *width / 7.0;
            worksheet.set_column_width(*col as u16, excel_width)?;
        }

        // Write cells
        for (&(row, col), cell) in &sheet.grid.cells {
            let format = cell
                .number_format
                .as_deref()
                .filter(|f| *f != GENERAL_FORMAT)
                .map(|f| Format::new().set_num_format(f));
            let col = col as u16;

            match (&cell.value, format) {
                (CellValue::Empty, Some(fmt)) => {
                    worksheet.write_blank(row, col, &fmt)?;
                }
                (CellValue::Empty, None) => {}
                (CellValue::Number(n), Some(fmt)) => {
                    worksheet.write_number_with_format(row, col, *n, &fmt)?;
                }
                (CellValue::Number(n), None) => {
                    worksheet.write_number(row, col, *n)?;
                }
                (CellValue::Text(s), Some(fmt)) => {
                    worksheet.write_string_with_format(row, col, s, &fmt)?;
                }
                (CellValue::Text(s), None) => {
                    worksheet.write_string(row, col, s)?;
                }
                (CellValue::Boolean(b), Some(fmt)) => {
                    worksheet.write_boolean_with_format(row, col, *b, &fmt)?;
                }
                (CellValue::Boolean(b), None) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
            }
        }

        for table in workbook.tables_on(sheet_index) {
            write_native_table(worksheet, table)?;
        }
    }

    for name in &workbook.defined_names {
        let formula = format!("={}", absolute_reference(&name.sheet, &name.range));
        xlsx.define_name(&name.name, &formula)?;
    }

    let meta = WorkbookMeta::from_workbook(workbook).to_json()?;
    let meta_sheet = xlsx.add_worksheet();
    meta_sheet.set_name(META_SHEET_NAME)?;
    meta_sheet.set_hidden(true);
    let chars: Vec<char> = meta.chars().collect();
    for (row, chunk) in chars.chunks(META_CHUNK_CHARS).enumerate() {
        let text: String = chunk.iter().collect();
        meta_sheet.write_string(row as u32, 0, &text)?;
    }

    xlsx.save(path)?;
    Ok(())
}

/// Adds an Excel table for a saved table with a header row and at least
/// one data row. Other shapes only live in the metadata sheet.
fn write_native_table(
    worksheet: &mut Worksheet,
    table: &SavedTable,
) -> Result<(), PersistenceError> {
    if !table.has_headers || table.end_row <= table.start_row {
        return Ok(());
    }

    let columns: Vec<TableColumn> = table
        .columns
        .iter()
        .map(|c| TableColumn::new().set_header(c))
        .collect();
    let native = Table::new().set_name(&table.name).set_columns(&columns);

    worksheet.add_table(
        table.start_row,
        table.start_col as u16,
        table.end_row,
        table.end_col as u16,
        &native,
    )?;
    Ok(())
}

/// "'Sheet'!$A$1:$C$2"
fn absolute_reference(sheet: &str, range: &CellRange) -> String {
    let cell = |(row, col): (u32, u32)| format!("${}${}", index_to_col(col), row + 1);
    format!(
        "'{}'!{}:{}",
        sheet.replace('\'', "''"),
        cell(range.start),
        cell(range.end)
    )
}
