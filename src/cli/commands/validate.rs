//! Validate config command implementation

use crate::adapters::postgresql::redact_connection_string;
use crate::cli::{EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Chunk Size: {}", config.export.chunk_size);
        println!("  Rows per Sheet: {}", config.export.max_rows_per_sheet);
        println!("  Sync Threshold: {}", config.export.sync_threshold);
        println!("  Export Directory: {}", config.export.export_directory);
        println!("  Memory Window: {} rows", config.export.memory_rows_in_window);
        println!("  Max Cell Length: {}", config.export.max_cell_length);
        println!(
            "  Workers: {} (backlog {})",
            config.workers.pool_size, config.workers.queue_capacity
        );

        match config.postgresql {
            Some(ref pg_config) => {
                let raw: &str = pg_config.connection_string.expose_secret().as_ref();
                println!("  PostgreSQL: {}", redact_connection_string(raw));
                println!("  Orders Table: {}", pg_config.table);
                println!("  Max Connections: {}", pg_config.max_connections);
            }
            None => println!("  PostgreSQL: not configured (demo mode only)"),
        }
        println!();
        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_valid_config_exits_zero() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[export]\nchunk_size = 200").unwrap();
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_OK);
    }

    #[tokio::test]
    async fn test_invalid_config_exits_two() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[workers]\npool_size = 0").unwrap();
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
