//! PostgreSQL order source
//!
//! Pooled access to an orders table through deadpool-postgres, exposed to
//! the export engine as a [`crate::adapters::source::DataSource`].

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgresDataSource;
pub use client::{redact_connection_string, PostgreSQLClient};
