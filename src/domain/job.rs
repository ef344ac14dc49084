//! Export job model and lifecycle
//!
//! A job tracks one asynchronous export. Its state only moves forward:
//! `Pending -> Processing -> (Completed | Failed)`.

use crate::domain::errors::QuarryError;
use crate::domain::ids::JobId;
use crate::domain::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Created and queued, not yet picked up by a worker
    Pending,
    /// A worker is running the export
    Processing,
    /// Result file written
    Completed,
    /// Export aborted with an error
    Failed,
}

impl JobState {
    /// Whether the job has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step
    ///
    /// Staying in the same non-terminal state is allowed so that progress
    /// updates can be written while `Processing`.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Processing)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "PENDING",
            JobState::Processing => "PROCESSING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Export job record
///
/// # Examples
///
/// ```
/// use quarry::domain::job::{Job, JobState};
///
/// let mut job = Job::new(Some(2_500));
/// assert_eq!(job.state, JobState::Pending);
///
/// job.mark_processing().unwrap();
/// job.record_progress(1_000).unwrap();
/// job.mark_completed("exports/result.xlsx".into()).unwrap();
///
/// assert_eq!(job.processed_rows, 1_000);
/// assert!(job.result_location.is_some());
/// assert!(job.completed_at.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,

    /// Matching row count observed at submission
    pub total_row_estimate: Option<u64>,

    /// Rows written so far; never decreases
    pub processed_rows: u64,

    /// Set iff `state == Completed`
    pub result_location: Option<PathBuf>,

    /// Set iff `state == Failed`
    pub error_detail: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set iff the job is terminal
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a pending job with a fresh id
    pub fn new(total_row_estimate: Option<u64>) -> Self {
        Self {
            id: JobId::generate(),
            state: JobState::Pending,
            total_row_estimate,
            processed_rows: 0,
            result_location: None,
            error_detail: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Moves the job into `Processing`
    pub fn mark_processing(&mut self) -> Result<()> {
        self.transition(JobState::Processing)?;
        self.state = JobState::Processing;
        Ok(())
    }

    /// Raises the processed-row counter to `processed_rows`
    ///
    /// # Errors
    ///
    /// Fails if the job is not `Processing` or the counter would go down.
    pub fn record_progress(&mut self, processed_rows: u64) -> Result<()> {
        if self.state != JobState::Processing {
            return Err(QuarryError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: JobState::Processing,
            });
        }
        if processed_rows < self.processed_rows {
            return Err(QuarryError::JobStore(format!(
                "processed_rows for job {} cannot decrease from {} to {}",
                self.id, self.processed_rows, processed_rows
            )));
        }
        self.processed_rows = processed_rows;
        Ok(())
    }

    /// Marks the job completed with its result location
    pub fn mark_completed(&mut self, result_location: PathBuf) -> Result<()> {
        self.transition(JobState::Completed)?;
        self.state = JobState::Completed;
        self.result_location = Some(result_location);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Marks the job failed with a non-empty error detail
    pub fn mark_failed(&mut self, error_detail: impl Into<String>) -> Result<()> {
        self.transition(JobState::Failed)?;
        let mut detail = error_detail.into();
        if detail.trim().is_empty() {
            detail = "export failed without an error message".to_string();
        }
        self.state = JobState::Failed;
        self.error_detail = Some(detail);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Time between creation and completion, for terminal jobs
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }

    /// Checks the field invariants tied to the state
    pub fn check_consistency(&self) -> Result<()> {
        let ok = match self.state {
            JobState::Pending | JobState::Processing => {
                self.result_location.is_none()
                    && self.error_detail.is_none()
                    && self.completed_at.is_none()
            }
            JobState::Completed => {
                self.result_location.is_some()
                    && self.error_detail.is_none()
                    && self.completed_at.is_some()
            }
            JobState::Failed => {
                self.error_detail.is_some()
                    && self.result_location.is_none()
                    && self.completed_at.is_some()
            }
        };
        if ok {
            Ok(())
        } else {
            Err(QuarryError::JobStore(format!(
                "job {} has fields inconsistent with state {}",
                self.id, self.state
            )))
        }
    }

    fn transition(&self, next: JobState) -> Result<()> {
        if self.state.can_transition_to(next) && self.state != next {
            Ok(())
        } else {
            Err(QuarryError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: next,
            })
        }
    }
}
