//! Export summary and reporting

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Content type for XLSX downloads
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Suggested download file name, `orders_{yyyyMMdd_HHmmss}.xlsx`
pub fn download_file_name(at: DateTime<Local>) -> String {
    format!("orders_{}.xlsx", at.format("%Y%m%d_%H%M%S"))
}

/// How an export was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    Sync,
    Async,
}

impl ExportMode {
    /// Metric tag value
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::Sync => "sync",
            ExportMode::Async => "async",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a finished export
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub mode: ExportMode,

    /// Data rows written
    pub rows: u64,

    /// Worksheet names in order
    pub sheets: Vec<String>,

    /// Size of the XLSX package
    pub bytes_written: u64,

    /// Pages fetched from the source
    pub pages: usize,

    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

impl ExportSummary {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Rows per second, zero for instantaneous exports
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.rows as f64 / secs
    }
}

fn serialize_duration_ms<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
