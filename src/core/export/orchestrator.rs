//! Export orchestrator - routes and runs order exports
//!
//! Small exports stream straight into the caller's sink. Large or explicitly
//! asynchronous exports become jobs that run on the worker pool and write
//! `{export_directory}/{job_id}.xlsx`.

use crate::adapters::source::DataSource;
use crate::config::{ExportConfig, QuarryConfig};
use crate::core::export::paginator::Paginator;
use crate::core::export::summary::{ExportMode, ExportSummary};
use crate::core::jobs::{InMemoryJobStore, JobRegistry, JobStore};
use crate::core::metrics::{MetricsSink, EXPORT_DURATION, EXPORT_ERRORS, EXPORT_ROWS};
use crate::core::pool::WorkerPool;
use crate::core::sheet::{ColumnSet, SheetSettings, SpreadsheetWriter, WorkbookSummary};
use crate::domain::{ExportFilter, ExportRequest, Job, JobId, JobState, QuarryError, Result};
use crate::{log_error_with_context, log_export_complete, log_export_progress, log_export_start};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;

/// Rows between job progress log lines
const PROGRESS_LOG_INTERVAL: u64 = 50_000;

/// Tunables for the export engine
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub chunk_size: usize,
    pub sync_threshold: u64,
    pub export_directory: PathBuf,
    pub sheet: SheetSettings,
}

impl From<&ExportConfig> for ExportSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            sync_threshold: config.sync_threshold,
            export_directory: PathBuf::from(&config.export_directory),
            sheet: SheetSettings::from(config),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

/// What [`ExportOrchestrator::export`] did with a request
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    /// Written into the caller's sink
    Streamed(ExportSummary),
    /// Handed to the worker pool; poll the job for progress
    Submitted(Job),
}

/// Export engine entry point
///
/// Cheap to clone; clones share the source, job store, pool and metrics.
#[derive(Clone)]
pub struct ExportOrchestrator {
    source: Arc<dyn DataSource>,
    jobs: JobRegistry,
    pool: Arc<WorkerPool>,
    metrics: Arc<dyn MetricsSink>,
    settings: Arc<ExportSettings>,
}

impl ExportOrchestrator {
    pub fn new(
        source: Arc<dyn DataSource>,
        store: Arc<dyn JobStore>,
        pool: Arc<WorkerPool>,
        metrics: Arc<dyn MetricsSink>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            source,
            jobs: JobRegistry::new(store),
            pool,
            metrics,
            settings: Arc::new(settings),
        }
    }

    /// Builds an orchestrator with an in-memory job store and a pool sized
    /// from configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(
        config: &QuarryConfig,
        source: Arc<dyn DataSource>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self::new(
            source,
            Arc::new(InMemoryJobStore::new()),
            Arc::new(WorkerPool::from_config(&config.workers)),
            metrics,
            ExportSettings::from(&config.export),
        )
    }

    /// Runs or submits an export depending on the request and its size
    ///
    /// Explicitly asynchronous requests always become jobs. Otherwise the
    /// matching rows are counted and exports above `sync_threshold` become
    /// jobs while the rest stream into `sink`.
    ///
    /// # Errors
    ///
    /// Invalid column projections, count failures, and any failure of the
    /// synchronous path are returned. A full worker backlog yields
    /// [`QuarryError::Backpressure`].
    pub async fn export<W>(&self, request: &ExportRequest, sink: &mut W) -> Result<ExportOutcome>
    where
        W: Write + Send + ?Sized,
    {
        ColumnSet::project(request.filter.columns.as_deref())?;

        let count = match self.source.count(&request.filter).await {
            Ok(count) => count,
            Err(e) => {
                let mode = if request.async_requested {
                    ExportMode::Async
                } else {
                    ExportMode::Sync
                };
                self.record_error(mode);
                return Err(e);
            }
        };
        let route_async = request.async_requested || count > self.settings.sync_threshold;

        tracing::debug!(
            count,
            async_requested = request.async_requested,
            sync_threshold = self.settings.sync_threshold,
            route_async,
            "Routing export"
        );

        if route_async {
            let job = self
                .submit_with_estimate(request.filter.clone(), Some(count))
                .await?;
            Ok(ExportOutcome::Submitted(job))
        } else {
            let summary = self.stream_export(&request.filter, sink).await?;
            Ok(ExportOutcome::Streamed(summary))
        }
    }

    /// Runs the export on the calling task and writes the workbook to `sink`
    ///
    /// On failure the sink may hold a partial or empty result.
    pub async fn stream_export<W>(&self, filter: &ExportFilter, sink: &mut W) -> Result<ExportSummary>
    where
        W: Write + Send + ?Sized,
    {
        let mode = ExportMode::Sync;
        log_export_start!(mode.as_str(), None::<u64>);
        let start = Instant::now();

        let result = self.write_workbook(filter, sink, start).await;
        self.observe(mode, start, &result);
        result
    }

    /// Counts matching rows and submits a background export
    ///
    /// # Errors
    ///
    /// Fails when the count fails, the projection is invalid, or the
    /// backlog is full. No job is created in those cases.
    pub async fn submit_async(&self, filter: ExportFilter) -> Result<Job> {
        ColumnSet::project(filter.columns.as_deref())?;
        let count = self.source.count(&filter).await.inspect_err(|_| {
            self.record_error(ExportMode::Async);
        })?;
        self.submit_with_estimate(filter, Some(count)).await
    }

    /// Current state of a job
    pub async fn job_status(&self, id: &JobId) -> Result<Job> {
        self.jobs.get(id).await
    }

    /// All known jobs, oldest first
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.jobs.list().await
    }

    /// Location of a completed job's workbook
    ///
    /// # Errors
    ///
    /// - [`QuarryError::JobNotFound`] for unknown ids
    /// - [`QuarryError::JobNotReady`] unless the job is `Completed`
    /// - [`QuarryError::ResultMissing`] when the file no longer exists
    pub async fn resolve_download(&self, id: &JobId) -> Result<PathBuf> {
        let job = self.jobs.get(id).await?;
        if job.state != JobState::Completed {
            return Err(QuarryError::JobNotReady {
                id: job.id,
                state: job.state,
            });
        }

        let path = job
            .result_location
            .ok_or_else(|| QuarryError::ResultMissing(job.id.clone()))?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(QuarryError::ResultMissing(job.id)),
        }
    }

    /// Stops accepting background work and waits for running jobs
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    async fn submit_with_estimate(
        &self,
        filter: ExportFilter,
        estimate: Option<u64>,
    ) -> Result<Job> {
        // Claim a slot before the job exists so a full backlog leaves no trace.
        let slot = match self.pool.reserve() {
            Ok(slot) => slot,
            Err(e) => {
                tracing::warn!(error = %e, "Background export rejected");
                self.record_error(ExportMode::Async);
                return Err(e);
            }
        };
        let job = self.jobs.create(estimate).await?;

        log_export_start!(ExportMode::Async.as_str(), estimate);
        tracing::info!(job_id = %job.id, "Submitted background export");

        let this = self.clone();
        let id = job.id.clone();
        slot.submit(async move { this.run_job(id, filter).await });

        Ok(job)
    }

    /// Runs a job body and records a panic in it as a job failure
    async fn run_job(&self, id: JobId, filter: ExportFilter) {
        let body = {
            let this = self.clone();
            let id = id.clone();
            tokio::spawn(async move { this.execute_job(id, filter).await })
        };

        let Err(e) = body.await else { return };
        let detail = abort_detail(e);
        tracing::error!(job_id = %id, error = %detail, "Export job aborted");
        self.record_error(ExportMode::Async);
        if let Err(e) = self.jobs.fail(&id, detail).await {
            log_error_with_context!(&e, "Failed to record aborted export job");
        }
    }

    async fn execute_job(&self, id: JobId, filter: ExportFilter) {
        let mode = ExportMode::Async;
        let start = Instant::now();

        // Pending cannot move straight to Failed, so there is nothing to record.
        let estimate = match self.jobs.mark_processing(&id).await {
            Ok(job) => job.total_row_estimate,
            Err(e) => {
                log_error_with_context!(&e, "Failed to start export job");
                self.record_error(mode);
                return;
            }
        };

        let path = self.settings.export_directory.join(format!("{id}.xlsx"));
        let result = self.write_job_file(&id, &filter, &path, estimate, start).await;
        self.observe(mode, start, &result);

        let recorded = match result {
            Ok(summary) => {
                tracing::info!(
                    job_id = %id,
                    rows = summary.rows,
                    sheets = summary.sheet_count(),
                    path = %path.display(),
                    "Export job completed"
                );
                self.jobs.complete(&id, path).await
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Export job failed");
                self.jobs.fail(&id, e.to_string()).await
            }
        };

        if let Err(e) = recorded {
            log_error_with_context!(&e, "Failed to record export job outcome");
        }
    }

    /// Writes a job's workbook to `path`
    ///
    /// Spool writes and packaging run on the blocking pool so status
    /// readers on the runtime are not starved.
    async fn write_job_file(
        &self,
        id: &JobId,
        filter: &ExportFilter,
        path: &Path,
        estimate: Option<u64>,
        start: Instant,
    ) -> Result<ExportSummary> {
        tokio::fs::create_dir_all(&self.settings.export_directory)
            .await
            .map_err(|e| {
                QuarryError::Io(format!(
                    "Failed to create export directory {}: {e}",
                    self.settings.export_directory.display()
                ))
            })?;

        let target = path.to_path_buf();
        let mut sink = blocking(move || {
            let file = File::create(&target).map_err(|e| {
                QuarryError::Io(format!("Failed to create {}: {e}", target.display()))
            })?;
            Ok(BufWriter::new(file))
        })
        .await?;

        let mode = ExportMode::Async;
        let filled = self.fill_workbook(filter, Some((id, estimate)), true).await?;
        let writer = filled.writer;
        let workbook = blocking(move || writer.finalize(&mut sink)).await?;
        Ok(self.summarize(mode, workbook, filled.processed, filled.pages, start))
    }

    /// Streams a workbook into a caller-held sink on the calling task
    async fn write_workbook<W>(
        &self,
        filter: &ExportFilter,
        sink: &mut W,
        start: Instant,
    ) -> Result<ExportSummary>
    where
        W: Write + Send + ?Sized,
    {
        let filled = self.fill_workbook(filter, None, false).await?;
        let workbook = filled.writer.finalize(sink)?;
        Ok(self.summarize(ExportMode::Sync, workbook, filled.processed, filled.pages, start))
    }

    /// Chunk loop shared by both delivery modes
    ///
    /// With `offload` set, each page is written to the spool on the blocking
    /// pool.
    async fn fill_workbook(
        &self,
        filter: &ExportFilter,
        job: Option<(&JobId, Option<u64>)>,
        offload: bool,
    ) -> Result<FilledWorkbook> {
        let columns = ColumnSet::project(filter.columns.as_deref())?;
        let mut writer = SpreadsheetWriter::new(self.settings.sheet.clone(), columns);
        let mut pages = Paginator::new(self.source.as_ref(), filter, self.settings.chunk_size);
        let mut processed: u64 = 0;

        while let Some(page) = pages.next_page().await? {
            let before = processed;
            processed += page.len() as u64;
            if offload {
                writer = blocking(move || {
                    writer.write_rows(&page)?;
                    Ok(writer)
                })
                .await?;
            } else {
                writer.write_rows(&page)?;
            }

            if let Some((id, estimate)) = job {
                self.jobs.record_progress(id, processed).await?;
                if processed / PROGRESS_LOG_INTERVAL > before / PROGRESS_LOG_INTERVAL {
                    log_export_progress!(id, processed, estimate);
                }
            }
        }

        Ok(FilledWorkbook {
            writer,
            processed,
            pages: pages.pages(),
        })
    }

    fn summarize(
        &self,
        mode: ExportMode,
        workbook: WorkbookSummary,
        rows: u64,
        pages: usize,
        start: Instant,
    ) -> ExportSummary {
        let summary = ExportSummary {
            mode,
            rows,
            sheets: workbook.sheet_names,
            bytes_written: workbook.bytes_written,
            pages,
            duration: start.elapsed(),
        };
        log_export_complete!(mode.as_str(), summary.rows, summary.sheet_count(), summary.duration);
        summary
    }

    fn record_error(&self, mode: ExportMode) {
        self.metrics
            .increment(EXPORT_ERRORS, 1, &[("type", mode.as_str())]);
    }

    fn observe(&self, mode: ExportMode, start: Instant, result: &Result<ExportSummary>) {
        let tags = [("type", mode.as_str())];
        match result {
            Ok(summary) => {
                self.metrics
                    .record_duration(EXPORT_DURATION, start.elapsed(), &tags);
                self.metrics.increment(EXPORT_ROWS, summary.rows, &tags);
            }
            Err(_) => self.record_error(mode),
        }
    }
}

/// A written but not yet packaged workbook
struct FilledWorkbook {
    writer: SpreadsheetWriter,
    processed: u64,
    pages: usize,
}

/// Runs file work on the blocking pool
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| QuarryError::Other(format!("Blocking export task failed: {e}")))?
}

/// Failure detail for a job whose task did not return
fn abort_detail(error: JoinError) -> String {
    if !error.is_panic() {
        return "export task was cancelled".to_string();
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|m| m.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match message {
        Some(m) => format!("export task panicked: {m}"),
        None => "export task panicked".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::InMemoryDataSource;
    use crate::core::metrics::InMemoryMetrics;
    use tempfile::TempDir;

    fn orchestrator(
        source: InMemoryDataSource,
        threshold: u64,
        dir: &TempDir,
    ) -> (ExportOrchestrator, Arc<InMemoryMetrics>) {
        let metrics = Arc::new(InMemoryMetrics::new());
        let settings = ExportSettings {
            chunk_size: 10,
            sync_threshold: threshold,
            export_directory: dir.path().join("exports"),
            sheet: SheetSettings {
                max_rows_per_sheet: 25,
                window_rows: 4,
                max_cell_length: 100,
                base_sheet_name: "Orders".to_string(),
            },
        };
        let orchestrator = ExportOrchestrator::new(
            Arc::new(source),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(WorkerPool::new(1, 2)),
            metrics.clone(),
            settings,
        );
        (orchestrator, metrics)
    }

    #[tokio::test]
    async fn test_small_export_streams() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, metrics) = orchestrator(InMemoryDataSource::generated(60), 100, &dir);

        let mut sink = Vec::new();
        let outcome = orchestrator
            .export(&ExportRequest::default(), &mut sink)
            .await
            .unwrap();

        let ExportOutcome::Streamed(summary) = outcome else {
            panic!("expected a streamed export");
        };
        assert_eq!(summary.rows, 60);
        assert_eq!(summary.sheets, vec!["Orders", "Orders_2", "Orders_3"]);
        assert_eq!(summary.pages, 7);
        assert!(!sink.is_empty());
        assert_eq!(metrics.counter(EXPORT_ROWS, &[("type", "sync")]), 60);
    }

    #[tokio::test]
    async fn test_threshold_routes_to_job() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(InMemoryDataSource::generated(60), 59, &dir);

        let mut sink = Vec::new();
        let outcome = orchestrator
            .export(&ExportRequest::default(), &mut sink)
            .await
            .unwrap();

        let ExportOutcome::Submitted(job) = outcome else {
            panic!("expected a submitted job");
        };
        assert_eq!(job.total_row_estimate, Some(60));
        assert!(sink.is_empty());
        orchestrator.shutdown().await;

        let done = orchestrator.job_status(&job.id).await.unwrap();
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.processed_rows, 60);
        assert_eq!(
            orchestrator.resolve_download(&job.id).await.unwrap(),
            dir.path().join("exports").join(format!("{}.xlsx", job.id))
        );
    }

    #[tokio::test]
    async fn test_invalid_projection_rejected_before_count() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(
            InMemoryDataSource::generated(5).fail_on_count(),
            100,
            &dir,
        );
        let request = ExportRequest::new(ExportFilter::all().with_columns(["bogus"]));
        let err = orchestrator
            .export(&request, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuarryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_download_of_unknown_job() {
        let dir = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(InMemoryDataSource::generated(1), 100, &dir);
        let err = orchestrator
            .resolve_download(&JobId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, QuarryError::JobNotFound(_)));
    }
}
