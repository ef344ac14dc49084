//! Logging and observability
//!
//! Structured logging through `tracing`, with JSON file output and
//! rotation when enabled in configuration.
//!
//! # Example
//!
//! ```no_run
//! use quarry::logging::init_logging;
//! use quarry::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of an export
///
/// ```no_run
/// use quarry::log_export_start;
///
/// log_export_start!("sync", Some(12_000u64));
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($mode:expr, $estimate:expr) => {
        tracing::info!(
            mode = $mode,
            estimated_rows = ?$estimate,
            "Starting export"
        );
    };
}

/// Log the completion of an export
///
/// ```no_run
/// use quarry::log_export_complete;
/// use std::time::Duration;
///
/// log_export_complete!("async", 250_000u64, 3usize, Duration::from_secs(12));
/// ```
#[macro_export]
macro_rules! log_export_complete {
    ($mode:expr, $rows:expr, $sheets:expr, $duration:expr) => {
        tracing::info!(
            mode = $mode,
            rows = $rows,
            sheets = $sheets,
            duration_ms = $duration.as_millis() as u64,
            "Export completed"
        );
    };
}

/// Log an error with context
///
/// ```no_run
/// use quarry::log_error_with_context;
/// use quarry::domain::QuarryError;
///
/// let error = QuarryError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log export progress against an optional estimate
#[macro_export]
macro_rules! log_export_progress {
    ($job:expr, $processed:expr, $estimate:expr) => {
        tracing::info!(
            job_id = %$job,
            processed_rows = $processed,
            estimated_rows = ?$estimate,
            "Export progress"
        );
    };
}
