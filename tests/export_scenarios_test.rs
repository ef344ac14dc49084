//! End-to-end export scenarios against the in-memory source
//!
//! These tests verify that:
//! - Large background exports roll over across sheets and complete
//! - A failing fetch fails the job with partial progress recorded
//! - Requests are routed by size and by the explicit async flag
//! - Downloads are refused until a result exists

use async_trait::async_trait;
use quarry::adapters::source::{DataSource, InMemoryDataSource};
use quarry::core::export::{ExportOrchestrator, ExportOutcome, ExportSettings};
use quarry::core::jobs::InMemoryJobStore;
use quarry::core::metrics::{InMemoryMetrics, EXPORT_ERRORS, EXPORT_ROWS};
use quarry::core::pool::WorkerPool;
use quarry::core::sheet::SheetSettings;
use quarry::domain::{Cursor as PageCursor, ExportFilter, ExportRequest, JobState, Order, QuarryError};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use test_case::test_case;

fn settings(dir: &TempDir, chunk_size: usize, rows_per_sheet: usize, threshold: u64) -> ExportSettings {
    ExportSettings {
        chunk_size,
        sync_threshold: threshold,
        export_directory: dir.path().join("exports"),
        sheet: SheetSettings {
            max_rows_per_sheet: rows_per_sheet,
            window_rows: 100,
            max_cell_length: 32_767,
            base_sheet_name: "Orders".to_string(),
        },
    }
}

fn orchestrator(
    source: Arc<dyn DataSource>,
    settings: ExportSettings,
    metrics: Arc<InMemoryMetrics>,
) -> ExportOrchestrator {
    ExportOrchestrator::new(
        source,
        Arc::new(InMemoryJobStore::new()),
        Arc::new(WorkerPool::new(2, 4)),
        metrics,
        settings,
    )
}

/// Data rows in each worksheet of a package, header excluded
fn rows_per_sheet(bytes: Vec<u8>) -> Vec<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut counts = Vec::new();
    for i in 1.. {
        let Ok(mut part) = archive.by_name(&format!("xl/worksheets/sheet{i}.xml")) else {
            break;
        };
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        counts.push(xml.matches("<row ").count() - 1);
    }
    counts
}

/// Source whose page fetches panic
struct PanickingSource;

#[async_trait]
impl DataSource for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn count(&self, _filter: &ExportFilter) -> quarry::domain::Result<u64> {
        Ok(10)
    }

    async fn fetch_page(
        &self,
        _cursor: PageCursor,
        _limit: usize,
        _filter: &ExportFilter,
    ) -> quarry::domain::Result<Vec<Order>> {
        panic!("row decoder exploded")
    }
}

fn read_file(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_large_async_export_rolls_over_sheets() {
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(250_000)),
        settings(&dir, 1_000, 100_000, 100_000),
        metrics.clone(),
    );

    let outcome = orchestrator
        .export(&ExportRequest::default(), &mut Vec::new())
        .await
        .unwrap();
    let ExportOutcome::Submitted(job) = outcome else {
        panic!("250k rows should exceed the sync threshold");
    };
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.total_row_estimate, Some(250_000));

    orchestrator.shutdown().await;

    let done = orchestrator.job_status(&job.id).await.unwrap();
    assert_eq!(done.state, JobState::Completed);
    assert_eq!(done.processed_rows, 250_000);
    assert!(done.completed_at.is_some());
    assert!(done.error_detail.is_none());

    let path = orchestrator.resolve_download(&job.id).await.unwrap();
    assert_eq!(path.file_name().unwrap(), format!("{}.xlsx", job.id).as_str());
    assert_eq!(rows_per_sheet(read_file(&path)), vec![100_000, 100_000, 50_000]);
    assert_eq!(metrics.counter(EXPORT_ROWS, &[("type", "async")]), 250_000);
}

#[tokio::test]
async fn test_fetch_failure_fails_job_with_partial_progress() {
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(InMemoryMetrics::new());
    let source = Arc::new(InMemoryDataSource::generated(10_000).fail_on_fetch(5));
    let orchestrator = orchestrator(
        source.clone(),
        settings(&dir, 1_000, 100_000, 100_000),
        metrics.clone(),
    );

    let job = orchestrator.submit_async(ExportFilter::all()).await.unwrap();
    orchestrator.shutdown().await;

    let failed = orchestrator.job_status(&job.id).await.unwrap();
    assert_eq!(failed.state, JobState::Failed);
    assert_eq!(failed.processed_rows, 4_000);
    assert!(!failed.error_detail.as_deref().unwrap_or("").is_empty());
    assert!(failed.result_location.is_none());
    assert_eq!(source.fetch_count(), 5);
    assert_eq!(metrics.counter(EXPORT_ERRORS, &[("type", "async")]), 1);

    let err = orchestrator.resolve_download(&job.id).await.unwrap_err();
    assert!(matches!(err, QuarryError::JobNotReady { state: JobState::Failed, .. }));
}

#[test_case(10, false, false ; "below threshold streams")]
#[test_case(50, false, false ; "at threshold streams")]
#[test_case(51, false, true ; "above threshold becomes a job")]
#[test_case(10, true, true ; "explicit async becomes a job")]
#[tokio::test]
async fn test_routing(rows: usize, async_requested: bool, expect_job: bool) {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(rows)),
        settings(&dir, 7, 1_000, 50),
        Arc::new(InMemoryMetrics::new()),
    );

    let mut request = ExportRequest::default();
    if async_requested {
        request = request.asynchronous();
    }

    let mut sink = Vec::new();
    let outcome = orchestrator.export(&request, &mut sink).await.unwrap();
    orchestrator.shutdown().await;

    match outcome {
        ExportOutcome::Streamed(summary) => {
            assert!(!expect_job);
            assert_eq!(summary.rows, rows as u64);
            assert_eq!(rows_per_sheet(sink), vec![rows]);
        }
        ExportOutcome::Submitted(job) => {
            assert!(expect_job);
            assert!(sink.is_empty());
            assert_eq!(job.total_row_estimate, Some(rows as u64));
            let done = orchestrator.job_status(&job.id).await.unwrap();
            assert_eq!(done.state, JobState::Completed);
            assert_eq!(done.processed_rows, rows as u64);
        }
    }
}

#[tokio::test]
async fn test_pagination_visits_every_row_once() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(InMemoryDataSource::generated(2_345));
    let orchestrator = orchestrator(
        source.clone(),
        settings(&dir, 100, 1_000_000, 100_000),
        Arc::new(InMemoryMetrics::new()),
    );

    let summary = orchestrator
        .stream_export(&ExportFilter::all(), &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(summary.rows, 2_345);

    let log = source.fetch_log();
    // A short page ends the loop without another round trip
    assert_eq!(log.len(), 24);
    assert_eq!(log.iter().map(|r| r.returned).sum::<usize>(), 2_345);
    assert!(log[0].cursor.last_seen().is_none());
    for pair in log.windows(2) {
        assert!(pair[0].cursor.last_seen() < pair[1].cursor.last_seen());
    }
    assert_eq!(log.last().unwrap().returned, 45);
    assert_eq!(summary.pages, 24);
}

#[tokio::test]
async fn test_filtered_export_counts_only_matching_rows() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(1_000)),
        settings(&dir, 64, 1_000, 100_000),
        Arc::new(InMemoryMetrics::new()),
    );

    let request = ExportRequest::new(
        ExportFilter::all()
            .with_status("PAID")
            .with_columns(["order_number", "id", "total_amount"]),
    );
    let mut sink = Vec::new();
    let outcome = orchestrator.export(&request, &mut sink).await.unwrap();
    let ExportOutcome::Streamed(summary) = outcome else {
        panic!("expected a streamed export");
    };

    // Generated statuses cycle through five values
    assert_eq!(summary.rows, 200);
    assert_eq!(rows_per_sheet(sink), vec![200]);
}

#[tokio::test]
async fn test_empty_export_has_header_only_sheet() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(0)),
        settings(&dir, 10, 10, 100),
        Arc::new(InMemoryMetrics::new()),
    );

    let mut sink = Vec::new();
    let summary = orchestrator
        .stream_export(&ExportFilter::all(), &mut sink)
        .await
        .unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(summary.sheets, vec!["Orders"]);
    assert_eq!(rows_per_sheet(sink), vec![0]);
}

#[tokio::test]
async fn test_download_refused_while_running_then_missing_after_delete() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(30).with_fetch_delay(Duration::from_millis(100))),
        settings(&dir, 10, 100, 100),
        Arc::new(InMemoryMetrics::new()),
    );

    let job = orchestrator.submit_async(ExportFilter::all()).await.unwrap();
    let err = orchestrator.resolve_download(&job.id).await.unwrap_err();
    assert!(matches!(err, QuarryError::JobNotReady { .. }));

    orchestrator.shutdown().await;
    let path = orchestrator.resolve_download(&job.id).await.unwrap();

    std::fs::remove_file(&path).unwrap();
    let err = orchestrator.resolve_download(&job.id).await.unwrap_err();
    assert!(matches!(err, QuarryError::ResultMissing(_)));
}

#[tokio::test]
async fn test_panicking_fetch_fails_job() {
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = orchestrator(
        Arc::new(PanickingSource),
        settings(&dir, 10, 100, 100),
        metrics.clone(),
    );

    let job = orchestrator.submit_async(ExportFilter::all()).await.unwrap();
    orchestrator.shutdown().await;

    let failed = orchestrator.job_status(&job.id).await.unwrap();
    assert_eq!(failed.state, JobState::Failed);
    assert!(failed.completed_at.is_some());
    let detail = failed.error_detail.as_deref().unwrap();
    assert!(detail.contains("row decoder exploded"), "{detail}");
    assert!(failed.check_consistency().is_ok());
    assert_eq!(metrics.counter(EXPORT_ERRORS, &[("type", "async")]), 1);
}

#[tokio::test]
async fn test_failed_count_is_counted_as_error() {
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(InMemoryMetrics::new());
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(10).fail_on_count()),
        settings(&dir, 10, 100, 100),
        metrics.clone(),
    );

    assert!(orchestrator
        .export(&ExportRequest::default(), &mut Vec::new())
        .await
        .is_err());
    assert!(orchestrator.submit_async(ExportFilter::all()).await.is_err());

    assert_eq!(metrics.counter(EXPORT_ERRORS, &[("type", "sync")]), 1);
    assert_eq!(metrics.counter(EXPORT_ERRORS, &[("type", "async")]), 1);
    assert!(orchestrator.list_jobs().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_polls_stay_responsive_during_async_exports() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(
        Arc::new(InMemoryDataSource::generated(150_000)),
        settings(&dir, 5_000, 100_000, 10),
        Arc::new(InMemoryMetrics::new()),
    );

    let first = orchestrator.submit_async(ExportFilter::all()).await.unwrap();
    let second = orchestrator.submit_async(ExportFilter::all()).await.unwrap();

    let mut worst = Duration::ZERO;
    loop {
        let polled = Instant::now();
        let a = orchestrator.job_status(&first.id).await.unwrap();
        let b = orchestrator.job_status(&second.id).await.unwrap();
        worst = worst.max(polled.elapsed());
        if a.state.is_terminal() && b.state.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    orchestrator.shutdown().await;

    assert!(worst < Duration::from_secs(1), "worst poll took {worst:?}");
    for id in [&first.id, &second.id] {
        let job = orchestrator.job_status(id).await.unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.processed_rows, 150_000);
    }
}
