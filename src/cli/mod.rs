//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Quarry using clap.

pub mod commands;

use crate::domain::{DataSourceError, QuarryError};
use clap::{Parser, Subcommand};

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration and argument errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code when the data source cannot be reached
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code for failed exports
pub const EXIT_EXPORT_FAILED: i32 = 5;
/// Exit code when the user interrupts a wait on a background export
pub const EXIT_INTERRUPTED: i32 = 130;

/// Quarry - order exports to XLSX
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(version, about, long_about = None)]
#[command(author = "Quarry Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "quarry.toml", env = "QUARRY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "QUARRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export orders to an XLSX workbook
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

/// Maps an error to the process exit code
pub fn exit_code_for(error: &QuarryError) -> i32 {
    match error {
        QuarryError::Configuration(_) | QuarryError::Validation(_) => EXIT_CONFIG,
        QuarryError::DataSource(DataSourceError::ConnectionFailed(_)) => EXIT_CONNECTION,
        _ => EXIT_EXPORT_FAILED,
    }
}
