//! External system integrations for Quarry.
//!
//! - [`source`] - the [`DataSource`](source::DataSource) contract and the in-memory source
//! - [`postgresql`] - PostgreSQL implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry::adapters::postgresql::{PostgreSQLClient, PostgresDataSource};
//! use quarry::adapters::source::DataSource;
//! use quarry::config::{secret_string, PostgreSQLConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PostgreSQLConfig {
//!     connection_string: secret_string("postgresql://app:pw@localhost/shop".to_string()),
//!     table: "orders".to_string(),
//!     max_connections: 4,
//!     connection_timeout_seconds: 30,
//!     statement_timeout_seconds: 0,
//! };
//!
//! let source = PostgresDataSource::new(PostgreSQLClient::new(config)?);
//! source.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod postgresql;
pub mod source;
