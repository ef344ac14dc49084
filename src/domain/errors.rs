//! Domain error types
//!
//! This module defines the error hierarchy for Quarry. All errors are
//! domain-specific and don't expose third-party types.

use crate::domain::ids::JobId;
use crate::domain::job::JobState;
use thiserror::Error;

/// Main Quarry error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Data source errors (count or page fetch)
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Spreadsheet rendering or packaging errors
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// No job is registered under the given id
    #[error("Export job not found: {0}")]
    JobNotFound(JobId),

    /// The job exists but has no downloadable result yet
    #[error("Export job {id} is {state}, result is not available")]
    JobNotReady { id: JobId, state: JobState },

    /// The job completed but its result file is gone
    #[error("Export result for job {0} is missing on disk")]
    ResultMissing(JobId),

    /// Job store rejected an update
    #[error("Job store error: {0}")]
    JobStore(String),

    /// Illegal job lifecycle transition
    #[error("Invalid job transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    /// Worker pool backlog is full
    #[error("Export backlog is full ({capacity} queued), retry later")]
    Backpressure { capacity: usize },

    /// Worker pool is no longer accepting work
    #[error("Worker pool is shut down")]
    PoolClosed,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Data source errors
///
/// Errors raised while counting or paginating records. None of these are
/// retried by the export engine.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Failed to obtain a connection
    #[error("Failed to connect to data source: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A returned row could not be decoded into an order
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// The source returned a page that breaks the pagination contract
    #[error("Pagination contract violated: {0}")]
    ContractViolation(String),
}

/// Spreadsheet writer errors
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    /// Spool or package file could not be written
    #[error("Failed to write spreadsheet data: {0}")]
    WriteFailed(String),

    /// ZIP packaging failed
    #[error("Failed to package workbook: {0}")]
    PackagingFailed(String),

    /// Sheet name rejected by the XLSX format
    #[error("Invalid sheet name '{0}'")]
    InvalidSheetName(String),

    /// Row written before any sheet exists
    #[error("No active sheet")]
    NoActiveSheet,
}

impl From<std::io::Error> for SpreadsheetError {
    fn from(err: std::io::Error) -> Self {
        SpreadsheetError::WriteFailed(err.to_string())
    }
}

impl From<zip::result::ZipError> for SpreadsheetError {
    fn from(err: zip::result::ZipError) -> Self {
        SpreadsheetError::PackagingFailed(err.to_string())
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for QuarryError {
    fn from(err: toml::de::Error) -> Self {
        QuarryError::Configuration(format!("TOML parse error: {err}"))
    }
}
