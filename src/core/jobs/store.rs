//! Job storage
//!
//! [`JobStore`] is the persistence seam for export jobs. The in-memory
//! implementation keeps one lock per job so updates to unrelated jobs never
//! wait on each other; the map lock is only held for lookups and inserts.

use crate::domain::{Job, JobId, QuarryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Storage for export job records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job; its id must not be registered yet
    async fn create(&self, job: Job) -> Result<()>;

    /// Returns a snapshot of the job, if registered
    async fn get(&self, id: &JobId) -> Result<Option<Job>>;

    /// Replaces the whole job record
    ///
    /// # Errors
    ///
    /// Rejects unknown ids, illegal state transitions, a decreasing
    /// `processed_rows`, and records whose fields contradict their state.
    async fn replace(&self, job: Job) -> Result<()>;

    /// Snapshot of every job, oldest first
    async fn list(&self) -> Result<Vec<Job>>;
}

/// Checks that `next` is a legal successor of `current`
pub fn validate_replacement(current: &Job, next: &Job) -> Result<()> {
    if !current.state.can_transition_to(next.state) {
        return Err(QuarryError::InvalidTransition {
            id: current.id.clone(),
            from: current.state,
            to: next.state,
        });
    }
    if next.processed_rows < current.processed_rows {
        return Err(QuarryError::JobStore(format!(
            "processed_rows for job {} cannot decrease from {} to {}",
            current.id, current.processed_rows, next.processed_rows
        )));
    }
    next.check_consistency()
}

/// Process-local job store
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: &JobId) -> Option<Arc<Mutex<Job>>> {
        self.jobs.read().await.get(id).cloned()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: Job) -> Result<()> {
        job.check_consistency()?;
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(QuarryError::JobStore(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id.clone(), Arc::new(Mutex::new(job)));
        Ok(())
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>> {
        match self.slot(id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn replace(&self, job: Job) -> Result<()> {
        let slot = self
            .slot(&job.id)
            .await
            .ok_or_else(|| QuarryError::JobNotFound(job.id.clone()))?;

        let mut current = slot.lock().await;
        validate_replacement(&current, &job)?;
        *current = job;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let slots: Vec<Arc<Mutex<Job>>> = self.jobs.read().await.values().cloned().collect();
        let mut jobs = Vec::with_capacity(slots.len());
        for slot in slots {
            jobs.push(slot.lock().await.clone());
        }
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}
