//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for merge pipeline integration tests.

#![allow(dead_code)]

use engine::{CellRange, CellValue, Table};
use merge_engine::{
    JoinSpec, Processor, RunConfig, SheetHandle, StoreError, StoreResult, TableRef,
    TabularDataStore, TemplateBlock, TemplateLocation,
};
use persistence::Workbook;

pub const PEOPLE_SHEET: &str = "People";
pub const ORG_SHEET: &str = "Org";
pub const TEMPLATE_SHEET: &str = "Template";
pub const RESULT_SHEET: &str = "Report";
pub const AMOUNT_FORMAT: &str = "#,##0.00";

/// Test harness holding a workbook and the processor that runs against it.
pub struct TestHarness {
    pub workbook: Workbook,
    pub processor: Processor,
}

impl TestHarness {
    /// Create a new test harness with an empty workbook.
    pub fn new() -> Self {
        TestHarness {
            workbook: Workbook::new(),
            processor: Processor::default(),
        }
    }

    /// Staff (ID, Name, Amount) on People, Depts (ID, Dept) on Org and a
    /// two-row HeaderTemplate. IDs 1 and 3 are in Sales, 2 is in Ops.
    pub fn with_sample_data() -> Self {
        let mut harness = Self::new();
        harness.add_staff(&StaffFixture::data());
        harness.add_depts(&[(1.0, "Sales"), (2.0, "Ops"), (3.0, "Sales")]);
        harness.add_header_template();
        harness
    }

    /// One department per entry of `sizes`, with that many staff members.
    /// IDs run from 1 in department order.
    pub fn with_groups(sizes: &[(&str, usize)]) -> Self {
        let mut harness = Self::new();
        let mut staff = Vec::new();
        let mut depts = Vec::new();
        for (dept, size) in sizes {
            for _ in 0..*size {
                let id = staff.len() as f64 + 1.0;
                staff.push((id, format!("Person {}", id), id * 10.0));
                depts.push((id, *dept));
            }
        }
        let staff_refs: Vec<(f64, &str, f64)> =
            staff.iter().map(|(id, name, amount)| (*id, name.as_str(), *amount)).collect();
        harness.add_staff(&staff_refs);
        harness.add_depts(&depts);
        harness.add_header_template();
        harness
    }

    pub fn add_staff(&mut self, rows: &[(f64, &str, f64)]) {
        let rows = rows
            .iter()
            .map(|(id, name, amount)| {
                vec![
                    CellValue::Number(*id),
                    CellValue::text(*name),
                    CellValue::Number(*amount),
                ]
            })
            .collect();
        self.workbook
            .add_table(PEOPLE_SHEET, "Staff", (0, 0), &["ID", "Name", "Amount"], rows)
            .unwrap();
        self.workbook
            .set_column_format("Staff", "Amount", AMOUNT_FORMAT)
            .unwrap();
    }

    pub fn add_depts(&mut self, rows: &[(f64, &str)]) {
        let rows = rows
            .iter()
            .map(|(id, dept)| vec![CellValue::Number(*id), CellValue::text(*dept)])
            .collect();
        self.workbook
            .add_table(ORG_SHEET, "Depts", (0, 0), &["ID", "Dept"], rows)
            .unwrap();
    }

    /// Sites (Dept, Floor) on Org, to the right of Depts.
    pub fn add_sites(&mut self, rows: &[(&str, f64)]) {
        let rows = rows
            .iter()
            .map(|(dept, floor)| vec![CellValue::text(*dept), CellValue::Number(*floor)])
            .collect();
        self.workbook
            .add_table(ORG_SHEET, "Sites", (0, 4), &["Dept", "Floor"], rows)
            .unwrap();
    }

    /// {tableName} | {rowCount}
    /// Total       | {sum:Amount}
    pub fn add_header_template(&mut self) {
        let index = self.workbook.add_sheet(TEMPLATE_SHEET);
        let grid = &mut self.workbook.sheets[index].grid;
        grid.write_block(
            (0, 0),
            &[
                vec![CellValue::text("{tableName}"), CellValue::text("{rowCount}")],
                vec![CellValue::text("Total"), CellValue::text("{sum:Amount}")],
            ],
        );
        self.workbook
            .define_name("HeaderTemplate", TEMPLATE_SHEET, "A1:B2")
            .unwrap();
    }

    pub fn run(
        &mut self,
        config: &RunConfig,
    ) -> merge_engine::MergeResult<merge_engine::RunSummary> {
        self.processor.run(&mut self.workbook, config)
    }

    pub fn read_table(&self, sheet: &str, table: &str) -> Table {
        self.workbook.read_table(&TableRef::new(sheet, table)).unwrap()
    }

    pub fn value_at(&self, sheet: &str, row: u32, col: u32) -> CellValue {
        self.workbook.sheet(sheet).unwrap().grid.value_at(row, col)
    }
}

/// Fixture for staff data.
pub struct StaffFixture;

impl StaffFixture {
    pub fn data() -> Vec<(f64, &'static str, f64)> {
        vec![(1.0, "Alice", 10.0), (2.0, "Bob", 20.0), (3.0, "Carol", 30.0)]
    }
}

pub fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Staff joined to Depts on ID, grouped by Dept, written to Report.
pub fn sample_config() -> RunConfig {
    RunConfig {
        primary: TableRef::new(PEOPLE_SHEET, "Staff"),
        secondary: TableRef::new(ORG_SHEET, "Depts"),
        join: JoinSpec::new("ID", "ID"),
        group_by: cols(&["Dept"]),
        primary_columns: cols(&["ID", "Name", "Amount"]),
        secondary_columns: cols(&["Dept"]),
        output_columns: cols(&["ID", "Name", "Dept", "Amount"]),
        template: TemplateLocation::named(),
        result_sheet_name: RESULT_SHEET.to_string(),
        ..RunConfig::default()
    }
}

// ============================================================================
// FAILING STORE
// ============================================================================

/// Delegates to a workbook, but `create_table` fails on call `fail_on`
/// (1-based).
pub struct FailingStore {
    pub inner: Workbook,
    pub fail_on: usize,
    pub create_calls: usize,
}

impl FailingStore {
    pub fn new(inner: Workbook, fail_on: usize) -> Self {
        FailingStore {
            inner,
            fail_on,
            create_calls: 0,
        }
    }
}

impl TabularDataStore for FailingStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        self.inner.list_sheets()
    }

    fn list_tables(&self, sheet: &str) -> StoreResult<Vec<String>> {
        self.inner.list_tables(sheet)
    }

    fn list_columns(&self, table: &TableRef) -> StoreResult<Vec<String>> {
        self.inner.list_columns(table)
    }

    fn read_table(&self, table: &TableRef) -> StoreResult<Table> {
        self.inner.read_table(table)
    }

    fn read_column_format(&self, table: &TableRef, column: &str) -> StoreResult<Option<String>> {
        self.inner.read_column_format(table, column)
    }

    fn resolve_template_range(
        &self,
        sheet: Option<&str>,
        address: Option<&str>,
        named_region: &str,
    ) -> StoreResult<Option<TemplateBlock>> {
        self.inner.resolve_template_range(sheet, address, named_region)
    }

    fn used_range_address(&self, sheet: &str) -> StoreResult<Option<String>> {
        self.inner.used_range_address(sheet)
    }

    fn create_or_clear_sheet(&mut self, name: &str) -> StoreResult<SheetHandle> {
        self.inner.create_or_clear_sheet(name)
    }

    fn write_block(
        &mut self,
        sheet: &SheetHandle,
        start_row: u32,
        start_col: u32,
        values: &[Vec<CellValue>],
    ) -> StoreResult<()> {
        self.inner.write_block(sheet, start_row, start_col, values)
    }

    fn set_column_formats(
        &mut self,
        sheet: &SheetHandle,
        row: u32,
        formats: &[String],
    ) -> StoreResult<()> {
        self.inner.set_column_formats(sheet, row, formats)
    }

    fn create_table(
        &mut self,
        sheet: &SheetHandle,
        range: CellRange,
        has_headers: bool,
        name: &str,
    ) -> StoreResult<String> {
        self.create_calls += 1;
        if self.create_calls == self.fail_on {
            return Err(StoreError::Backend("table service unavailable".to_string()));
        }
        self.inner.create_table(sheet, range, has_headers, name)
    }

    fn delete_table(&mut self, name: &str) -> StoreResult<()> {
        self.inner.delete_table(name)
    }

    fn autofit_columns(&mut self, sheet: &SheetHandle) -> StoreResult<()> {
        self.inner.autofit_columns(sheet)
    }
}
