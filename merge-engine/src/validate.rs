//! FILENAME: merge-engine/src/validate.rs
//! PURPOSE: Validator - checks run preconditions before anything is written.
//! CONTEXT: Runs after join and grouping, before layout. Every check runs;
//! failures are collected into one `ValidationReport` whose message lists all
//! of them.

use thiserror::Error;

use crate::definition::RunConfig;

/// One failed precondition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("Primary sheet or table not selected.")]
    PrimaryNotSelected,

    #[error("Secondary sheet or table not selected.")]
    SecondaryNotSelected,

    #[error("Primary join column \"{0}\" not found.")]
    PrimaryJoinColumnMissing(String),

    #[error("Secondary join column \"{0}\" not found.")]
    SecondaryJoinColumnMissing(String),

    #[error("No output columns selected.")]
    NoOutputColumns,

    #[error("Invalid group-by columns selected: {}.", .0.join(", "))]
    InvalidGroupBy(Vec<String>),

    #[error("Filter {index} column \"{column}\" not found.")]
    FilterColumnMissing { index: usize, column: String },

    #[error("Extension table {index}: sheet or table not selected.")]
    ExtensionNotSelected { index: usize },

    #[error("Extension table {index}: result join column \"{column}\" not found.")]
    ExtensionResultColumnMissing { index: usize, column: String },

    #[error("Extension table {index}: extension join column \"{column}\" not found.")]
    ExtensionColumnMissing { index: usize, column: String },
}

/// Every failed precondition of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// Headers of the fetched source tables. Extensions are in configured order.
#[derive(Debug, Clone, Copy)]
pub struct SourceHeaders<'a> {
    pub primary: &'a [String],
    pub secondary: &'a [String],
    pub extensions: &'a [&'a [String]],
}

impl SourceHeaders<'_> {
    fn contains_any(&self, column: &str) -> bool {
        std::iter::once(self.primary)
            .chain(std::iter::once(self.secondary))
            .chain(self.extensions.iter().copied())
            .any(|headers| headers.iter().any(|h| h == column))
    }
}

pub fn validate(config: &RunConfig, headers: &SourceHeaders<'_>) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();

    if !config.primary.is_selected() {
        report.push(ValidationIssue::PrimaryNotSelected);
    }
    if !config.secondary.is_selected() {
        report.push(ValidationIssue::SecondaryNotSelected);
    }

    let primary_join = config.primary_join_column();
    if !headers.primary.iter().any(|h| h == primary_join) {
        report.push(ValidationIssue::PrimaryJoinColumnMissing(primary_join.to_string()));
    }
    let secondary_join = config.secondary_join_column();
    if !headers.secondary.iter().any(|h| h == secondary_join) {
        report.push(ValidationIssue::SecondaryJoinColumnMissing(secondary_join.to_string()));
    }

    let output_columns = config.output_order();
    if output_columns.is_empty() {
        report.push(ValidationIssue::NoOutputColumns);
    }

    let invalid_group_by: Vec<String> = config
        .group_by
        .iter()
        .filter(|c| !headers.contains_any(c))
        .cloned()
        .collect();
    if !invalid_group_by.is_empty() {
        report.push(ValidationIssue::InvalidGroupBy(invalid_group_by));
    }

    for (i, filter) in config.filters.iter().enumerate() {
        if filter.is_active() && !headers.primary.iter().any(|h| *h == filter.column) {
            report.push(ValidationIssue::FilterColumnMissing {
                index: i + 1,
                column: filter.column.clone(),
            });
        }
    }

    for (i, ext) in config.extensions.iter().enumerate() {
        let index = i + 1;
        if !ext.table.is_selected() {
            report.push(ValidationIssue::ExtensionNotSelected { index });
        }

        let result_column = &ext.join.result_column;
        if result_column.is_empty() || !output_columns.contains(result_column) {
            report.push(ValidationIssue::ExtensionResultColumnMissing {
                index,
                column: result_column.clone(),
            });
        }

        let other_column = &ext.join.other_column;
        let ext_headers = headers.extensions.get(i).copied().unwrap_or_default();
        if other_column.is_empty() || !ext_headers.contains(other_column) {
            report.push(ValidationIssue::ExtensionColumnMissing {
                index,
                column: other_column.clone(),
            });
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(report)
    }
}
