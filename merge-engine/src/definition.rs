//! FILENAME: merge-engine/src/definition.rs
//! Merge Definition - The serializable run configuration.
//!
//! This module contains all the types needed to DESCRIBE a merge run.
//! These structures are designed to be:
//! - Serializable (camelCase JSON, as sent by the calling surface)
//! - Immutable snapshots of the user's selection, passed into one run
//!
//! Nothing in here touches a data store; see `processor` for execution.

use serde::{Deserialize, Serialize};

use crate::columns::default_output_order;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Blank rows between consecutive output tables.
pub const DEFAULT_TABLE_GAP: u32 = 3;

/// Output tables are named `Table_1`, `Table_2`, ...
pub const DEFAULT_TABLE_PREFIX: &str = "Table_";

/// Used when the sanitized result sheet name comes out empty.
pub const DEFAULT_RESULT_SHEET: &str = "Full Report";

/// Sheet names are limited to 31 characters.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Named region holding the template when no explicit location is given.
pub const TEMPLATE_NAMED_REGION: &str = "HeaderTemplate";

/// Number format used when no source table defines one for a column.
pub const DEFAULT_NUMBER_FORMAT: &str = "General";

// ============================================================================
// TABLE REFERENCES AND JOINS
// ============================================================================

/// A table selected on a given sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub sheet: String,
    pub table: String,
}

impl TableRef {
    pub fn new(sheet: impl Into<String>, table: impl Into<String>) -> Self {
        TableRef {
            sheet: sheet.into(),
            table: table.into(),
        }
    }

    /// Both the sheet and the table have been chosen.
    pub fn is_selected(&self) -> bool {
        !self.sheet.trim().is_empty() && !self.table.trim().is_empty()
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.sheet, self.table)
    }
}

/// An equality join on one column pair.
/// `result_column` is read from the row being enriched, `other_column` from the joined table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    pub result_column: String,
    pub other_column: String,
}

impl JoinSpec {
    pub fn new(result_column: impl Into<String>, other_column: impl Into<String>) -> Self {
        JoinSpec {
            result_column: result_column.into(),
            other_column: other_column.into(),
        }
    }
}

/// An extension table joined against the evolving merged row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    pub table: TableRef,
    pub join: JoinSpec,
    /// Columns of this extension picked for the output.
    #[serde(default)]
    pub selected_columns: Vec<String>,
}

impl ExtensionSpec {
    pub fn new(table: TableRef, join: JoinSpec) -> Self {
        ExtensionSpec {
            table,
            join,
            selected_columns: Vec::new(),
        }
    }
}

// ============================================================================
// FILTERS AND TEMPLATE LOCATION
// ============================================================================

/// An equality predicate on a primary column. An empty value means inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub column: String,
    #[serde(default)]
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// Where the header template lives. Without both parts the named region is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLocation {
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl TemplateLocation {
    pub fn new(sheet: impl Into<String>, address: impl Into<String>) -> Self {
        TemplateLocation {
            sheet: Some(sheet.into()),
            address: Some(address.into()),
        }
    }

    /// Use the named template region.
    pub fn named() -> Self {
        TemplateLocation::default()
    }

    /// Sheet and address, when both are present and non-blank.
    pub fn explicit(&self) -> Option<(&str, &str)> {
        let sheet = self.sheet.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let address = self.address.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((sheet, address))
    }
}

// ============================================================================
// RUN CONFIGURATION
// ============================================================================

/// The complete selection state for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub primary: TableRef,
    pub secondary: TableRef,

    /// `result_column` is the primary join column, `other_column` the secondary one.
    pub join: JoinSpec,

    #[serde(default)]
    pub filters: Vec<Filter>,

    #[serde(default)]
    pub group_by: Vec<String>,

    #[serde(default)]
    pub extensions: Vec<ExtensionSpec>,

    /// Primary columns picked for the output.
    #[serde(default)]
    pub primary_columns: Vec<String>,

    /// Secondary columns picked for the output.
    #[serde(default)]
    pub secondary_columns: Vec<String>,

    /// Final column order of every output table.
    #[serde(default)]
    pub output_columns: Vec<String>,

    #[serde(default)]
    pub template: TemplateLocation,

    #[serde(default)]
    pub result_sheet_name: String,
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.is_active())
    }

    pub fn primary_join_column(&self) -> &str {
        &self.join.result_column
    }

    pub fn secondary_join_column(&self) -> &str {
        &self.join.other_column
    }

    /// The column order of every output table. Without an explicit order the
    /// picked columns are used in selection order.
    pub fn output_order(&self) -> Vec<String> {
        if !self.output_columns.is_empty() {
            return self.output_columns.clone();
        }
        let extensions: Vec<Vec<String>> = self
            .extensions
            .iter()
            .map(|e| e.selected_columns.clone())
            .collect();
        default_output_order(&self.primary_columns, &self.secondary_columns, &extensions)
    }

    /// Every source table of the run: primary, secondary, then extensions in order.
    pub fn source_tables(&self) -> impl Iterator<Item = &TableRef> {
        [&self.primary, &self.secondary]
            .into_iter()
            .chain(self.extensions.iter().map(|e| &e.table))
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Tunables of the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    pub table_gap: u32,
    pub table_prefix: String,
    pub default_result_sheet: String,
    pub max_sheet_name_len: usize,
    pub template_named_region: String,
    pub default_number_format: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            table_gap: DEFAULT_TABLE_GAP,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            default_result_sheet: DEFAULT_RESULT_SHEET.to_string(),
            max_sheet_name_len: MAX_SHEET_NAME_LEN,
            template_named_region: TEMPLATE_NAMED_REGION.to_string(),
            default_number_format: DEFAULT_NUMBER_FORMAT.to_string(),
        }
    }
}
