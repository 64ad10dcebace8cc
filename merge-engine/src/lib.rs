//! FILENAME: merge-engine/src/lib.rs
//! PURPOSE: Library root for the table merge pipeline.
//! CONTEXT: Combines a primary and a secondary table by a join key, enriches
//! the result with extension tables, filters and groups the rows, and writes
//! one table per group to an output sheet, each under a rendered header
//! template.
//!
//! PIPELINE: RunConfig --> filter --> join --> group --> validate
//!           --> layout + template --> TabularDataStore writes

pub mod logging;

pub mod cache;
pub mod columns;
pub mod definition;
pub mod error;
pub mod filter;
pub mod group;
pub mod join;
pub mod layout;
pub mod naming;
pub mod processor;
pub mod store;
pub mod validate;

// Re-export commonly used types for convenience
pub use cache::{SelectionCache, SheetSnapshot, TableSnapshot, WorkbookSnapshot};
pub use columns::{
    default_output_order, group_by_candidates, reconcile_group_by, reconcile_output_order,
};
pub use definition::{
    ExtensionSpec, Filter, JoinSpec, MergeOptions, RunConfig, TableRef, TemplateLocation,
};
pub use error::{MergeError, MergeResult, StoreError, StoreResult};
pub use filter::filter_rows;
pub use group::{partition, Group, GroupKey};
pub use join::{
    merge_rows, resolve_column_formats, ColumnFormats, JoinSource, LookupIndex, MergedRows,
};
pub use layout::{plan_layout, LayoutOperation};
pub use naming::{sanitize_sheet_name, TableNameAllocator};
pub use processor::{Processor, RunGuard, RunSummary};
pub use store::{SheetHandle, TabularDataStore, TemplateBlock};
pub use validate::{validate, SourceHeaders, ValidationIssue, ValidationReport};
