//! Job registry
//!
//! Lifecycle operations on top of a [`JobStore`]. Each operation reads the
//! current record, applies one transition and writes it back.

use super::store::JobStore;
use crate::domain::{Job, JobId, QuarryError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Lifecycle front end for export jobs
#[derive(Clone)]
pub struct JobRegistry {
    store: Arc<dyn JobStore>,
}

impl JobRegistry {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Registers a new pending job
    pub async fn create(&self, total_row_estimate: Option<u64>) -> Result<Job> {
        let job = Job::new(total_row_estimate);
        self.store.create(job.clone()).await?;
        tracing::debug!(job_id = %job.id, estimate = ?total_row_estimate, "Registered export job");
        Ok(job)
    }

    /// Current snapshot of a job
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::JobNotFound`] for unknown ids.
    pub async fn get(&self, id: &JobId) -> Result<Job> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| QuarryError::JobNotFound(id.clone()))
    }

    pub async fn list(&self) -> Result<Vec<Job>> {
        self.store.list().await
    }

    pub async fn mark_processing(&self, id: &JobId) -> Result<Job> {
        self.update(id, |job| job.mark_processing()).await
    }

    pub async fn record_progress(&self, id: &JobId, processed_rows: u64) -> Result<Job> {
        self.update(id, |job| job.record_progress(processed_rows))
            .await
    }

    pub async fn complete(&self, id: &JobId, location: PathBuf) -> Result<Job> {
        self.update(id, |job| job.mark_completed(location)).await
    }

    pub async fn fail(&self, id: &JobId, detail: String) -> Result<Job> {
        self.update(id, |job| job.mark_failed(detail)).await
    }

    async fn update<F>(&self, id: &JobId, apply: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let mut job = self.get(id).await?;
        apply(&mut job)?;
        self.store.replace(job.clone()).await?;
        Ok(job)
    }
}
