//! Configuration management for Quarry.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `QUARRY_*`
//! environment overrides, defaults for every optional setting, and
//! validation on load.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quarry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//!
//! println!("Chunk size: {}", config.export.chunk_size);
//! println!("Workers: {}", config.workers.pool_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [export]
//! chunk_size = 1000
//! max_rows_per_sheet = 1000000
//! sync_threshold = 100000
//! export_directory = "./exports"
//!
//! [workers]
//! pool_size = 2
//! queue_capacity = 10
//!
//! [postgresql]
//! connection_string = "${QUARRY_PG_URL}"
//! table = "orders"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_from_str};
pub use schema::{
    ApplicationConfig, ExportConfig, LoggingConfig, PostgreSQLConfig, QuarryConfig, WorkerConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
