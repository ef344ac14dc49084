//! Init command implementation
//!
//! Writes a commented sample `quarry.toml`.

use crate::cli::{EXIT_CONFIG, EXIT_EXPORT_FAILED, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "quarry.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Quarry configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        match fs::write(&self.output, sample_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Set QUARRY_PG_URL in your environment or a .env file");
                println!("  2. Validate configuration: quarry validate-config");
                println!("  3. Run export: quarry export --output orders.xlsx");
                println!("     or try it without a database: quarry export --demo-rows 5000");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_EXPORT_FAILED)
            }
        }
    }
}

/// Sample configuration with every setting at its default
pub fn sample_config() -> &'static str {
    r#"# Quarry Configuration File
# Order exports to XLSX

[application]
# trace, debug, info, warn, error
log_level = "info"

[export]
# Orders fetched per database round trip (1-50000)
chunk_size = 1000

# Data rows per sheet before continuing on Orders_2, Orders_3, ...
max_rows_per_sheet = 1000000

# Exports matching more rows than this run in the background
sync_threshold = 100000

# Where background exports are written as <job_id>.xlsx
export_directory = "./exports"

# Rows kept in memory before flushing to disk
memory_rows_in_window = 100

# Longer text is cut and ends with "..."
max_cell_length = 32767

sheet_name = "Orders"

[workers]
# Background exports running at once
pool_size = 2

# Background exports allowed to wait; further submissions are rejected
queue_capacity = 10

[postgresql]
connection_string = "${QUARRY_PG_URL}"
table = "orders"
max_connections = 10
connection_timeout_seconds = 30
# 0 disables the statement timeout
statement_timeout_seconds = 0

[logging]
local_enabled = false
local_path = "./logs"
# daily, hourly, never
local_rotation = "daily"
"#
}
