//! Core business logic for Quarry.
//!
//! # Modules
//!
//! - [`export`] - Export orchestration, pagination and summaries
//! - [`sheet`] - Bounded-memory XLSX writer
//! - [`jobs`] - Background job store and lifecycle
//! - [`pool`] - Worker pool running background exports
//! - [`metrics`] - Metric sinks
//!
//! # Export Workflow
//!
//! 1. **Route**: count matching orders and pick sync or async delivery
//! 2. **Paginate**: fetch chunks in ascending id order after a cursor
//! 3. **Write**: append rows, opening a new sheet when the current one is full
//! 4. **Track**: record job progress after each chunk (async only)
//! 5. **Package**: zip the sheets into an XLSX workbook
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry::adapters::source::InMemoryDataSource;
//! use quarry::config::QuarryConfig;
//! use quarry::core::export::{ExportOrchestrator, ExportOutcome};
//! use quarry::core::metrics::TracingMetrics;
//! use quarry::domain::ExportRequest;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QuarryConfig::default();
//! let source = Arc::new(InMemoryDataSource::generated(5_000));
//! let orchestrator = ExportOrchestrator::from_config(&config, source, Arc::new(TracingMetrics));
//!
//! let mut file = std::fs::File::create("orders.xlsx")?;
//! match orchestrator.export(&ExportRequest::default(), &mut file).await? {
//!     ExportOutcome::Streamed(summary) => println!("{} rows", summary.rows),
//!     ExportOutcome::Submitted(job) => println!("job {}", job.id),
//! }
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod jobs;
pub mod metrics;
pub mod pool;
pub mod sheet;
