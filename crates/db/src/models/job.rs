//! Job entity model and DTOs for batch submissions.

use larder_core::progress::progress_percentage;
use larder_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};
use super::task::TaskView;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub status_id: StatusId,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub failed_tasks: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Whether the job has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            JobStatus::from_id(self.status_id),
            Some(JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
        )
    }
}

/// Request body for `POST /api/v1/admin/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBatch {
    pub prompts: Vec<String>,
    pub style: Option<String>,
    pub count_per_prompt: Option<i32>,
}

/// Poll-friendly projection of a job, returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub id: DbId,
    pub status: &'static str,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub failed_tasks: i32,
    pub progress_percentage: f64,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            status: JobStatus::from_id(job.status_id)
                .map(JobStatus::name)
                .unwrap_or("unknown"),
            total_tasks: job.total_tasks,
            completed_tasks: job.completed_tasks,
            failed_tasks: job.failed_tasks,
            progress_percentage: progress_percentage(
                job.completed_tasks,
                job.failed_tasks,
                job.total_tasks,
            ),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// Full job detail, including per-task rows.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub status: JobStatusView,
    pub updated_at: Timestamp,
    pub tasks: Vec<TaskView>,
}
