//! Export command implementation
//!
//! Runs an order export through the orchestrator. Synchronous exports are
//! written straight to `--output`; background exports are polled until they
//! finish and their file location is printed.

use crate::adapters::postgresql::{PostgreSQLClient, PostgresDataSource};
use crate::adapters::source::{DataSource, InMemoryDataSource};
use crate::cli::{
    exit_code_for, EXIT_CONFIG, EXIT_CONNECTION, EXIT_EXPORT_FAILED, EXIT_INTERRUPTED, EXIT_OK,
};
use crate::config::{load_config, QuarryConfig};
use crate::core::export::{download_file_name, ExportOrchestrator, ExportOutcome, ExportSummary};
use crate::core::metrics::TracingMetrics;
use crate::domain::{ExportFilter, ExportRequest, Job, JobState};
use chrono::NaiveDateTime;
use clap::Args;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Accepted timestamp formats for `--from` / `--to`
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Only orders created at or after this time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long)]
    pub from: Option<String>,

    /// Only orders created at or before this time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long)]
    pub to: Option<String>,

    /// Only orders with this status
    #[arg(long)]
    pub status: Option<String>,

    /// Columns to export (comma-separated keys)
    #[arg(long)]
    pub columns: Option<String>,

    /// Always run as a background job
    #[arg(long = "async")]
    pub run_async: bool,

    /// Destination for synchronous exports (default: orders_<timestamp>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export N generated orders instead of reading PostgreSQL
    #[arg(long, value_name = "N")]
    pub demo_rows: Option<usize>,

    /// Job status polling interval in milliseconds
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let config = match self.load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let request = match self.build_request() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Invalid arguments: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let source = match self.build_source(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let orchestrator =
            ExportOrchestrator::from_config(&config, source, Arc::new(TracingMetrics));

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(download_file_name(chrono::Local::now())));

        println!("🚀 Starting export...");
        let code = self.run(&orchestrator, &request, &output).await?;
        Ok(finish(&orchestrator, code).await)
    }

    fn load_config(&self, config_path: &str) -> crate::domain::Result<QuarryConfig> {
        if self.demo_rows.is_some() && !Path::new(config_path).exists() {
            tracing::info!("No configuration file found, using defaults for demo export");
            return Ok(QuarryConfig::default());
        }
        load_config(config_path)
    }

    /// Builds the request from the filter flags
    pub fn build_request(&self) -> Result<ExportRequest, String> {
        let mut filter = ExportFilter::all();
        if let Some(ref from) = self.from {
            filter = filter.with_from(parse_timestamp(from)?);
        }
        if let Some(ref to) = self.to {
            filter = filter.with_to(parse_timestamp(to)?);
        }
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(format!("--from {from} is after --to {to}"));
            }
        }
        if let Some(ref status) = self.status {
            filter = filter.with_status(status.trim());
        }
        if let Some(ref columns) = self.columns {
            filter = filter.with_columns(
                columns
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty()),
            );
        }

        let request = ExportRequest::new(filter);
        Ok(if self.run_async {
            request.asynchronous()
        } else {
            request
        })
    }

    async fn build_source(&self, config: &QuarryConfig) -> Result<Arc<dyn DataSource>, i32> {
        if let Some(rows) = self.demo_rows {
            tracing::info!(rows, "Using generated demo orders");
            return Ok(Arc::new(InMemoryDataSource::generated(rows)));
        }

        let Some(pg_config) = config.postgresql.clone() else {
            eprintln!("No [postgresql] section configured. Add one or use --demo-rows.");
            return Err(EXIT_CONFIG);
        };

        let client = match PostgreSQLClient::new(pg_config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to initialize PostgreSQL client: {e}");
                return Err(exit_code_for(&e));
            }
        };

        let source = PostgresDataSource::new(client);
        if let Err(e) = source.test_connection().await {
            tracing::error!(error = %e, "PostgreSQL connection failed");
            eprintln!("Failed to connect to PostgreSQL: {e}");
            return Err(EXIT_CONNECTION);
        }
        Ok(Arc::new(source))
    }

    async fn run(
        &self,
        orchestrator: &ExportOrchestrator,
        request: &ExportRequest,
        output: &Path,
    ) -> anyhow::Result<i32> {
        let mut file = std::fs::File::create(output)?;
        let outcome = orchestrator.export(request, &mut file).await;
        drop(file);

        match outcome {
            Ok(ExportOutcome::Streamed(summary)) => {
                print_summary(&summary, output);
                Ok(EXIT_OK)
            }
            Ok(ExportOutcome::Submitted(job)) => {
                remove_unused(output);
                self.wait_for_job(orchestrator, job, interrupted()).await
            }
            Err(e) => {
                remove_unused(output);
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }

    async fn wait_for_job<I>(
        &self,
        orchestrator: &ExportOrchestrator,
        job: Job,
        interrupt: I,
    ) -> anyhow::Result<i32>
    where
        I: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        println!("📋 Export running in background as job {}", job.id);

        let interval = Duration::from_millis(self.poll_interval_ms.max(10));
        let mut last_reported = None;

        loop {
            let current = orchestrator.job_status(&job.id).await?;

            if last_reported != Some(current.processed_rows) {
                match current.total_row_estimate {
                    Some(total) if total > 0 => println!(
                        "   {} / {} rows ({:.1}%)",
                        current.processed_rows,
                        total,
                        current.processed_rows as f64 / total as f64 * 100.0
                    ),
                    _ => println!("   {} rows", current.processed_rows),
                }
                last_reported = Some(current.processed_rows);
            }

            match current.state {
                JobState::Completed => {
                    let path = orchestrator.resolve_download(&job.id).await?;
                    println!();
                    println!("✅ Export completed: {}", path.display());
                    if let Some(elapsed) = current.duration() {
                        println!("   Duration: {:.2}s", elapsed.num_milliseconds() as f64 / 1000.0);
                    }
                    return Ok(EXIT_OK);
                }
                JobState::Failed => {
                    println!();
                    println!(
                        "❌ Export failed: {}",
                        current.error_detail.as_deref().unwrap_or("unknown error")
                    );
                    return Ok(EXIT_EXPORT_FAILED);
                }
                JobState::Pending | JobState::Processing => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut interrupt => {
                    tracing::info!(job_id = %job.id, "Interrupted while waiting for export job");
                    println!("\n⚠️  Interrupted; job {} was abandoned", job.id);
                    return Ok(EXIT_INTERRUPTED);
                }
            }
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be watched
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Drains background work, except after an interrupt where the running
/// job is left behind so the process can exit at once
async fn finish(orchestrator: &ExportOrchestrator, code: i32) -> i32 {
    if code == EXIT_INTERRUPTED {
        tracing::warn!("Exiting without waiting for background exports");
    } else {
        orchestrator.shutdown().await;
    }
    code
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
        .ok_or_else(|| format!("invalid timestamp '{value}', expected YYYY-MM-DDTHH:MM:SS"))
}

fn remove_unused(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "Could not remove unused output file");
    }
}

fn print_summary(summary: &ExportSummary, output: &Path) {
    println!();
    println!("📊 Export Summary:");
    println!("  Rows: {}", summary.rows);
    println!("  Sheets: {} ({})", summary.sheet_count(), summary.sheets.join(", "));
    println!("  Size: {} bytes", summary.bytes_written);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Throughput: {:.0} rows/s", summary.throughput());
    println!();
    println!("✅ Export written to {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::ExportSettings;
    use crate::core::jobs::InMemoryJobStore;
    use crate::core::metrics::InMemoryMetrics;
    use crate::core::pool::WorkerPool;
    use tempfile::TempDir;

    fn slow_orchestrator(dir: &TempDir) -> ExportOrchestrator {
        let settings = ExportSettings {
            chunk_size: 10,
            export_directory: dir.path().to_path_buf(),
            ..ExportSettings::default()
        };
        ExportOrchestrator::new(
            Arc::new(InMemoryDataSource::generated(50).with_fetch_delay(Duration::from_millis(200))),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(WorkerPool::new(1, 1)),
            Arc::new(InMemoryMetrics::new()),
            settings,
        )
    }

    #[tokio::test]
    async fn test_interrupt_leaves_running_job_behind() {
        let dir = TempDir::new().unwrap();
        let orchestrator = slow_orchestrator(&dir);
        let job = orchestrator.submit_async(ExportFilter::all()).await.unwrap();

        let args = ExportArgs {
            poll_interval_ms: 10,
            ..ExportArgs::default()
        };
        let code = args
            .wait_for_job(&orchestrator, job.clone(), std::future::ready(()))
            .await
            .unwrap();
        assert_eq!(code, EXIT_INTERRUPTED);

        let exited = tokio::time::timeout(
            Duration::from_millis(100),
            finish(&orchestrator, code),
        )
        .await;
        assert_eq!(exited.unwrap(), EXIT_INTERRUPTED);
        assert!(!orchestrator.job_status(&job.id).await.unwrap().state.is_terminal());
    }

    #[tokio::test]
    async fn test_finish_drains_after_normal_exit() {
        let dir = TempDir::new().unwrap();
        let orchestrator = slow_orchestrator(&dir);
        let job = orchestrator.submit_async(ExportFilter::all()).await.unwrap();

        assert_eq!(finish(&orchestrator, EXIT_OK).await, EXIT_OK);
        assert_eq!(
            orchestrator.job_status(&job.id).await.unwrap().state,
            JobState::Completed
        );
    }

    #[test]
    fn test_build_request_defaults() {
        let request = ExportArgs::default().build_request().unwrap();
        assert_eq!(request, ExportRequest::default());
    }

    #[test]
    fn test_build_request_with_filters() {
        let args = ExportArgs {
            from: Some("2024-01-01T00:00:00".to_string()),
            to: Some("2024-01-31 23:59:59".to_string()),
            status: Some(" PAID ".to_string()),
            columns: Some("id, total_amount,,notes".to_string()),
            run_async: true,
            ..ExportArgs::default()
        };
        let request = args.build_request().unwrap();

        assert!(request.async_requested);
        assert_eq!(request.filter.status.as_deref(), Some("PAID"));
        assert_eq!(
            request.filter.columns,
            Some(vec![
                "id".to_string(),
                "total_amount".to_string(),
                "notes".to_string()
            ])
        );
        assert!(request.filter.from.is_some());
    }

    #[test]
    fn test_build_request_rejects_bad_range() {
        let args = ExportArgs {
            from: Some("2024-02-01T00:00:00".to_string()),
            to: Some("2024-01-01T00:00:00".to_string()),
            ..ExportArgs::default()
        };
        assert!(args.build_request().is_err());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-01T00:00:00").is_err());
    }
}
