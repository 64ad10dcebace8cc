//! FILENAME: persistence/src/xlsx_reader.rs
//! Loads XLSX files into a `Workbook`.

use crate::{
    DefinedName, PersistenceError, SavedTable, Sheet, Workbook, WorkbookMeta, META_SHEET_NAME,
};
use calamine::{open_workbook, Data, Reader, Xlsx};
use engine::{parse_range, CellValue};
use std::io::{Read, Seek};
use std::path::Path;

pub fn load_xlsx(path: &Path) -> Result<Workbook, PersistenceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names: Vec<String> = workbook
        .sheet_names()
        .into_iter()
        .filter(|name| name != META_SHEET_NAME)
        .collect();

    if sheet_names.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let mut sheets = Vec::new();

    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

        // cells() positions are relative to the range's first cell
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        let mut sheet = Sheet::new(sheet_name.clone());

        for (row_idx, col_idx, cell) in range.cells() {
            let value = match cell {
                Data::Empty => continue,
                Data::String(s) => CellValue::Text(s.clone()),
                Data::Float(f) => CellValue::Number(*f),
                Data::Int(i) => CellValue::Number(*i as f64),
                Data::Bool(b) => CellValue::Boolean(*b),
                Data::Error(e) => CellValue::Text(format!("{:?}", e)),
                Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
                Data::DateTimeIso(s) => CellValue::Text(s.clone()),
                Data::DurationIso(s) => CellValue::Text(s.clone()),
            };
            sheet.grid.set_value(
                row_offset + row_idx as u32,
                col_offset + col_idx as u32,
                value,
            );
        }

        sheets.push(sheet);
    }

    let mut result = Workbook {
        sheets,
        tables: Vec::new(),
        defined_names: read_defined_names(&workbook),
    };

    match read_meta(&mut workbook)? {
        Some(meta) => apply_meta(&mut result, meta),
        None => result.tables = read_native_tables(&mut workbook, &sheet_names)?,
    }

    Ok(result)
}

/// Names that point at a cell range on a known sheet. Built-in names
/// (print areas, filter databases) are skipped.
fn read_defined_names<RS: Read + Seek>(workbook: &Xlsx<RS>) -> Vec<DefinedName> {
    workbook
        .defined_names()
        .iter()
        .filter(|(name, _)| !name.starts_with("_xlnm"))
        .filter_map(|(name, formula)| {
            let address = parse_range(formula)?;
            Some(DefinedName {
                name: name.clone(),
                sheet: address.sheet?,
                range: address.range,
            })
        })
        .collect()
}

/// The JSON written by `save_xlsx`, None for files from other producers.
fn read_meta<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
) -> Result<Option<WorkbookMeta>, PersistenceError> {
    if !workbook.sheet_names().iter().any(|n| n == META_SHEET_NAME) {
        return Ok(None);
    }
    let range = workbook
        .worksheet_range(META_SHEET_NAME)
        .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

    let json: String = range
        .rows()
        .filter_map(|row| match row.first() {
            Some(Data::String(s)) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    if json.is_empty() {
        return Ok(None);
    }
    Ok(Some(WorkbookMeta::from_json(&json)?))
}

fn apply_meta(workbook: &mut Workbook, meta: WorkbookMeta) {
    for format in &meta.number_formats {
        if let Some(sheet) = workbook.sheets.get_mut(format.sheet_index) {
            sheet.grid.set_number_format(format.row, format.col, &format.format);
        }
    }
    let sheet_count = workbook.sheets.len();
    workbook.tables = meta
        .tables
        .into_iter()
        .filter(|t| t.sheet_index < sheet_count)
        .collect();
}

/// Tables defined in the file itself. Tables without a data body are skipped.
fn read_native_tables<RS: Read + Seek>(
    workbook: &mut Xlsx<RS>,
    sheet_names: &[String],
) -> Result<Vec<SavedTable>, PersistenceError> {
    workbook.load_tables()?;
    let names: Vec<String> = workbook.table_names().into_iter().cloned().collect();

    let mut tables = Vec::new();
    for name in names {
        let table = workbook.table_by_name(&name)?;
        let Some(sheet_index) = sheet_names.iter().position(|s| s == table.sheet_name()) else {
            continue;
        };
        let data = table.data();
        let (Some(start), Some(end)) = (data.start(), data.end()) else {
            continue;
        };

        tables.push(SavedTable {
            name: table.name().to_string(),
            sheet_index,
            // The data range starts below the header row
            start_row: start.0.saturating_sub(1),
            start_col: start.1,
            end_row: end.0,
            end_col: end.1,
            columns: table.columns().to_vec(),
            has_headers: true,
        });
    }
    Ok(tables)
}
