//! Export orchestration
//!
//! - [`orchestrator`] - sync/async routing, chunk loop, job lifecycle
//! - [`paginator`] - cursor-based page reads with contract checks
//! - [`summary`] - export results and download naming

pub mod orchestrator;
pub mod paginator;
pub mod summary;

pub use orchestrator::{ExportOrchestrator, ExportOutcome, ExportSettings};
pub use paginator::Paginator;
pub use summary::{download_file_name, ExportMode, ExportSummary, XLSX_CONTENT_TYPE};
