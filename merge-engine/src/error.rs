//! FILENAME: merge-engine/src/error.rs
//! PURPOSE: Error taxonomy for merge runs and data store access.

use thiserror::Error;

use crate::validate::ValidationReport;

/// Failures a tabular data store may report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column \"{column}\" not found in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("Name not found: {0}")]
    NameNotFound(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Fatal outcomes of a merge run.
#[derive(Error, Debug)]
pub enum MergeError {
    /// No template block could be resolved.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One or more preconditions failed. The report holds every issue.
    #[error("{0}")]
    Validation(ValidationReport),

    #[error("Data access error: {0}")]
    DataAccess(#[from] StoreError),

    #[error("A merge run is already in progress")]
    RunInProgress,
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type MergeResult<T> = Result<T, MergeError>;
