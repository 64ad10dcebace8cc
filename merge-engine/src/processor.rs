//! FILENAME: merge-engine/src/processor.rs
//! PURPOSE: Orchestrator - runs the merge pipeline against a data store.
//! CONTEXT: One run is strictly sequential:
//!   resolve template -> fetch -> filter -> join -> group -> validate
//!   -> plan layout + render headers -> write -> autofit
//! Nothing is written until every operation has been planned and every header
//! block rendered. If a write fails, tables created earlier in the same run
//! are deleted again before the error is returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use engine::{CellValue, Table};
use template::{evaluate_template, GroupContext};

use crate::cache::{SelectionCache, SheetSnapshot, TableSnapshot, WorkbookSnapshot};
use crate::definition::{MergeOptions, RunConfig, TableRef};
use crate::error::{MergeError, MergeResult, StoreError, StoreResult};
use crate::filter::filter_rows;
use crate::group::{partition, Group};
use crate::join::{merge_rows, resolve_column_formats, ColumnFormats, JoinSource};
use crate::layout::{plan_layout, LayoutOperation};
use crate::logging::{
    log_debug, log_enter, log_error, log_exit, log_info, log_warn, CAT_MERGE, CAT_STORE,
    CAT_TEMPLATE,
};
use crate::naming::{sanitize_sheet_name, TableNameAllocator};
use crate::store::{SheetHandle, TabularDataStore, TemplateBlock};
use crate::validate::{validate, SourceHeaders};

/// Address suggested for a template sheet with nothing on it.
pub const DEFAULT_TEMPLATE_ADDRESS: &str = "A1";

// ============================================================================
// RUN GUARD
// ============================================================================

/// Held for the duration of a run. Dropping it re-enables runs.
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub result_sheet: String,
    /// Created table names, in layout order.
    pub tables: Vec<String>,
    /// Data rows written across all tables, header rows excluded.
    pub rows_written: usize,
}

/// A fully planned table: where it goes and its rendered header block.
#[derive(Debug, Clone)]
struct StagedTable {
    op: LayoutOperation,
    header: Vec<Vec<CellValue>>,
}

/// The fetched inputs of a run.
struct Sources {
    primary: Table,
    secondary: Table,
    extensions: Vec<Table>,
    formats: Vec<ColumnFormats>,
    existing_tables: Vec<String>,
}

// ============================================================================
// PROCESSOR
// ============================================================================

#[derive(Debug, Default)]
pub struct Processor {
    options: MergeOptions,
    cache: Mutex<SelectionCache>,
    running: AtomicBool,
}

impl Processor {
    pub fn new(options: MergeOptions) -> Self {
        Processor {
            options,
            cache: Mutex::new(SelectionCache::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Claims the run slot. Fails with `RunInProgress` while another guard is alive.
    pub fn begin_run(&self) -> MergeResult<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| MergeError::RunInProgress)?;
        Ok(RunGuard {
            flag: &self.running,
        })
    }

    fn cache(&self) -> MutexGuard<'_, SelectionCache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Executes one merge run.
    pub fn run<S>(&self, store: &mut S, config: &RunConfig) -> MergeResult<RunSummary>
    where
        S: TabularDataStore + ?Sized,
    {
        let _guard = self.begin_run()?;
        log_enter!(
            CAT_MERGE,
            "run",
            "primary={} secondary={} extensions={}",
            config.primary,
            config.secondary,
            config.extensions.len()
        );

        let result = self.execute(store, config);
        match &result {
            Ok(summary) => log_exit!(
                CAT_MERGE,
                "run",
                "sheet='{}' tables={} rows={}",
                summary.result_sheet,
                summary.tables.len(),
                summary.rows_written
            ),
            Err(e) => log_error!(CAT_MERGE, "run failed: {}", e),
        }
        result
    }

    fn execute<S>(&self, store: &mut S, config: &RunConfig) -> MergeResult<RunSummary>
    where
        S: TabularDataStore + ?Sized,
    {
        self.cache().observe(config);
        let output_columns = config.output_order();

        let template = self.resolve_template(&*store, config)?;
        let sources = self.fetch_sources(&*store, config, &output_columns)?;

        // Filter, join, group
        let filtered = filter_rows(&sources.primary, &config.filters);
        let extension_sources: Vec<JoinSource<'_>> = config
            .extensions
            .iter()
            .zip(&sources.extensions)
            .map(|(ext, table)| JoinSource {
                table,
                join: &ext.join,
            })
            .collect();
        let merged = merge_rows(
            &sources.primary,
            &filtered,
            JoinSource {
                table: &sources.secondary,
                join: &config.join,
            },
            &extension_sources,
        );
        let groups = partition(merged.rows, &config.group_by);
        log_info!(
            CAT_MERGE,
            "{} primary row(s), {} after filters, {} group(s)",
            sources.primary.row_count(),
            filtered.len(),
            groups.len()
        );

        // Validate
        let extension_headers: Vec<&[String]> = sources
            .extensions
            .iter()
            .map(|t| t.headers.as_slice())
            .collect();
        let headers = SourceHeaders {
            primary: &sources.primary.headers,
            secondary: &sources.secondary.headers,
            extensions: &extension_headers,
        };
        validate(config, &headers).map_err(MergeError::Validation)?;
        if config.secondary_columns.is_empty() {
            log_warn!(
                CAT_MERGE,
                "no secondary output columns selected, output carries primary data only"
            );
        }

        // Plan and render, no writes yet
        let result_sheet = sanitize_sheet_name(
            &config.result_sheet_name,
            self.options.max_sheet_name_len,
            &self.options.default_result_sheet,
        );
        let mut names =
            TableNameAllocator::new(self.options.table_prefix.clone(), &sources.existing_tables);
        let operations = plan_layout(
            &groups,
            &output_columns,
            template.row_count,
            self.options.table_gap,
            &mut names,
        );
        let staged = self.render_headers(&template, operations, &groups, config, &output_columns);
        let formats = resolve_column_formats(
            &output_columns,
            &sources.formats,
            &self.options.default_number_format,
        );

        // Commit
        let mut created = Vec::with_capacity(staged.len());
        let committed = commit(
            store,
            &result_sheet,
            &staged,
            &output_columns,
            &formats,
            &mut created,
        );
        self.cache().invalidate_snapshot();

        if let Err(err) = committed {
            log_error!(CAT_STORE, "write failed after {} table(s): {}", created.len(), err);
            rollback_tables(store, &created);
            return Err(MergeError::DataAccess(err));
        }

        Ok(RunSummary {
            result_sheet,
            rows_written: staged.iter().map(|s| s.op.rows.len()).sum(),
            tables: created,
        })
    }

    fn resolve_template<S>(&self, store: &S, config: &RunConfig) -> MergeResult<TemplateBlock>
    where
        S: TabularDataStore + ?Sized,
    {
        let (sheet, address) = match config.template.explicit() {
            Some((sheet, address)) => (Some(sheet), Some(address)),
            None => (None, None),
        };

        let resolved = store
            .resolve_template_range(sheet, address, &self.options.template_named_region)
            .map_err(|e| {
                MergeError::Configuration(format!("template could not be read: {}", e))
            })?;

        match resolved {
            Some(block) => {
                log_debug!(
                    CAT_TEMPLATE,
                    "template {}x{}",
                    block.row_count,
                    block.col_count
                );
                Ok(block)
            }
            None => Err(MergeError::Configuration(format!(
                "Specify the template sheet and range, or define a named range '{}'.",
                self.options.template_named_region
            ))),
        }
    }

    fn fetch_sources<S>(
        &self,
        store: &S,
        config: &RunConfig,
        output_columns: &[String],
    ) -> MergeResult<Sources>
    where
        S: TabularDataStore + ?Sized,
    {
        let primary = fetch_table(store, &config.primary)?;
        let secondary = fetch_table(store, &config.secondary)?;
        let extensions = config
            .extensions
            .iter()
            .map(|ext| fetch_table(store, &ext.table))
            .collect::<StoreResult<Vec<_>>>()?;

        let mut formats = Vec::with_capacity(2 + extensions.len());
        formats.push(fetch_formats(store, &config.primary, &primary, output_columns)?);
        formats.push(fetch_formats(store, &config.secondary, &secondary, output_columns)?);
        for (ext, table) in config.extensions.iter().zip(&extensions) {
            formats.push(fetch_formats(store, &ext.table, table, output_columns)?);
        }

        let mut existing_tables = Vec::new();
        for sheet in store.list_sheets()? {
            existing_tables.extend(store.list_tables(&sheet)?);
        }

        Ok(Sources {
            primary,
            secondary,
            extensions,
            formats,
            existing_tables,
        })
    }

    fn render_headers(
        &self,
        template: &TemplateBlock,
        operations: Vec<LayoutOperation>,
        groups: &[Group],
        config: &RunConfig,
        output_columns: &[String],
    ) -> Vec<StagedTable> {
        let join_column = Some(config.primary_join_column()).filter(|c| !c.is_empty());

        operations
            .into_iter()
            .map(|op| {
                let rows = groups
                    .get(op.group_index)
                    .map(|g| g.rows.as_slice())
                    .unwrap_or_default();
                let ctx = GroupContext {
                    table_name: &op.table_name,
                    rows,
                    output_headers: output_columns,
                    projected: &op.rows,
                    join_column,
                };
                let header = evaluate_template(&template.values, &ctx);
                StagedTable { op, header }
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Selection helpers
    // ------------------------------------------------------------------------

    /// Tells the cache about the current selection. True when it was invalidated.
    pub fn observe_selection(&self, config: &RunConfig) -> bool {
        self.cache().observe(config)
    }

    pub fn invalidate_cache(&self) {
        self.cache().invalidate_all();
    }

    /// Sorted distinct trimmed values of a column, cached per (table, column).
    pub fn unique_column_values<S>(
        &self,
        store: &S,
        table: &TableRef,
        column: &str,
    ) -> MergeResult<Vec<String>>
    where
        S: TabularDataStore + ?Sized,
    {
        if let Some(values) = self.cache().unique_values(table, column) {
            return Ok(values.to_vec());
        }

        let data = store.read_table(table)?;
        let idx = data
            .column_index(column)
            .ok_or_else(|| StoreError::ColumnNotFound {
                table: table.table.clone(),
                column: column.to_string(),
            })?;

        let mut values: Vec<String> = data
            .rows
            .iter()
            .map(|row| row.get(idx).map(CellValue::key_text).unwrap_or_default())
            .collect();
        values.sort();
        values.dedup();

        log_debug!(CAT_MERGE, "{} unique value(s) for {}[{}]", values.len(), table, column);
        self.cache()
            .store_unique_values(table, column, values.clone());
        Ok(values)
    }

    /// Sheets -> tables -> columns, cached until invalidated.
    pub fn workbook_snapshot<S>(&self, store: &S) -> MergeResult<WorkbookSnapshot>
    where
        S: TabularDataStore + ?Sized,
    {
        if let Some(snapshot) = self.cache().snapshot() {
            return Ok(snapshot.clone());
        }

        let mut snapshot = WorkbookSnapshot::default();
        for sheet in store.list_sheets()? {
            let mut tables = Vec::new();
            for table in store.list_tables(&sheet)? {
                let columns = store.list_columns(&TableRef::new(sheet.clone(), table.clone()))?;
                tables.push(TableSnapshot {
                    name: table,
                    columns,
                });
            }
            snapshot.sheets.push(SheetSnapshot {
                name: sheet,
                tables,
            });
        }

        self.cache().store_snapshot(snapshot.clone());
        Ok(snapshot)
    }

    /// The used range of `sheet` as a template address, "A1" when it is
    /// empty or cannot be read.
    pub fn suggest_template_address<S>(&self, store: &S, sheet: &str) -> String
    where
        S: TabularDataStore + ?Sized,
    {
        match store.used_range_address(sheet) {
            Ok(Some(address)) => address,
            Ok(None) => DEFAULT_TEMPLATE_ADDRESS.to_string(),
            Err(e) => {
                log_warn!(
                    CAT_TEMPLATE,
                    "could not read used range of '{}': {}, defaulting to {}",
                    sheet,
                    e,
                    DEFAULT_TEMPLATE_ADDRESS
                );
                DEFAULT_TEMPLATE_ADDRESS.to_string()
            }
        }
    }
}

// ============================================================================
// STORE HELPERS
// ============================================================================

/// Reads a selected table. Unselected tables read as an empty table so the
/// validator can report them alongside everything else.
fn fetch_table<S>(store: &S, table: &TableRef) -> StoreResult<Table>
where
    S: TabularDataStore + ?Sized,
{
    if !table.is_selected() {
        return Ok(Table::empty());
    }
    store.read_table(table)
}

/// Number formats of the output columns `table` provides.
fn fetch_formats<S>(
    store: &S,
    table_ref: &TableRef,
    table: &Table,
    output_columns: &[String],
) -> StoreResult<ColumnFormats>
where
    S: TabularDataStore + ?Sized,
{
    let mut formats = ColumnFormats::default();
    if !table_ref.is_selected() {
        return Ok(formats);
    }
    for column in output_columns.iter().filter(|c| table.has_column(c)) {
        if let Some(format) = store.read_column_format(table_ref, column)? {
            formats.insert(column.clone(), format);
        }
    }
    Ok(formats)
}

/// Writes every staged table in ascending row order. Names of the tables
/// created so far are pushed to `created`.
fn commit<S>(
    store: &mut S,
    sheet_name: &str,
    staged: &[StagedTable],
    output_columns: &[String],
    formats: &[String],
    created: &mut Vec<String>,
) -> StoreResult<()>
where
    S: TabularDataStore + ?Sized,
{
    let sheet: SheetHandle = store.create_or_clear_sheet(sheet_name)?;
    let header_row: Vec<CellValue> = output_columns
        .iter()
        .map(|c| CellValue::text(c.as_str()))
        .collect();

    for table in staged {
        let op = &table.op;

        if !table.header.is_empty() {
            let (row, col) = op.header_origin();
            store.write_block(&sheet, row, col, &table.header)?;
        }

        let (data_row, data_col) = op.data_origin();
        let mut block = Vec::with_capacity(op.rows.len() + 1);
        block.push(header_row.clone());
        block.extend(op.rows.iter().cloned());
        store.write_block(&sheet, data_row, data_col, &block)?;

        for offset in 1..=op.rows.len() as u32 {
            store.set_column_formats(&sheet, data_row + offset, formats)?;
        }

        let range = op.table_range(output_columns.len() as u32);
        let name = store.create_table(&sheet, range, true, &op.table_name)?;
        log_debug!(CAT_STORE, "created {} at {}", name, range);
        created.push(name);
    }

    store.autofit_columns(&sheet)?;
    Ok(())
}

/// Best-effort removal of tables created by a failed run.
fn rollback_tables<S>(store: &mut S, created: &[String])
where
    S: TabularDataStore + ?Sized,
{
    for name in created.iter().rev() {
        match store.delete_table(name) {
            Ok(()) => log_info!(CAT_STORE, "removed {} after failed write", name),
            Err(e) => log_warn!(CAT_STORE, "could not remove {}: {}", name, e),
        }
    }
}
