// Quarry - Order exports to XLSX
// Copyright (c) 2025 Quarry Contributors
// Licensed under the MIT License

//! # Quarry - Order exports to XLSX
//!
//! Quarry exports order records from a relational store into streaming XLSX
//! workbooks. Small exports are written straight to the caller; large ones
//! run as background jobs whose progress can be polled and whose result is
//! written to an export directory.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Paging** orders with keyset pagination (`id > cursor ORDER BY id`)
//! - **Writing** workbooks row by row with bounded memory, rolling over to a
//!   new sheet when one fills up
//! - **Routing** each request to a synchronous stream or a background job
//! - **Tracking** job state and progress in a concurrent job store
//!
//! ## Architecture
//!
//! Quarry follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export orchestration, sheets, jobs, workers)
//! - [`adapters`] - Data sources (PostgreSQL, in-memory)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::adapters::source::InMemoryDataSource;
//! use quarry::config::QuarryConfig;
//! use quarry::core::export::{ExportOrchestrator, ExportOutcome};
//! use quarry::core::metrics::TracingMetrics;
//! use quarry::domain::{ExportFilter, ExportRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuarryConfig::default();
//!     let source = Arc::new(InMemoryDataSource::generated(5_000));
//!     let orchestrator =
//!         ExportOrchestrator::from_config(&config, source, Arc::new(TracingMetrics));
//!
//!     let request = ExportRequest::new(ExportFilter::all().with_status("PAID"));
//!     let mut file = std::fs::File::create("orders.xlsx")?;
//!
//!     match orchestrator.export(&request, &mut file).await? {
//!         ExportOutcome::Streamed(summary) => println!("{} rows", summary.rows),
//!         ExportOutcome::Submitted(job) => println!("queued as {}", job.id),
//!     }
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`], an alias over
//! [`domain::QuarryError`]:
//!
//! ```rust,no_run
//! use quarry::domain::QuarryError;
//!
//! fn example() -> Result<(), QuarryError> {
//!     let config = quarry::config::load_config("quarry.toml")?;
//!     println!("chunk size {}", config.export.chunk_size);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
