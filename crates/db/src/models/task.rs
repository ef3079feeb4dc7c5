//! Task entity model and the wire format shared with the external queue.

use larder_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{StatusId, TaskStatus};

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub job_id: DbId,
    pub prompt: String,
    pub style: String,
    pub status_id: StatusId,
    pub image_id: Option<DbId>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Task {
    /// Whether the task has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            TaskStatus::from_id(self.status_id),
            Some(TaskStatus::Completed | TaskStatus::Failed)
        )
    }
}

/// Task projection embedded in the job-detail response.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: DbId,
    pub prompt: String,
    pub style: String,
    pub status: &'static str,
    pub image_id: Option<DbId>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            prompt: task.prompt.clone(),
            style: task.style.clone(),
            status: TaskStatus::from_id(task.status_id)
                .map(TaskStatus::name)
                .unwrap_or("unknown"),
            image_id: task.image_id,
            error_message: task.error_message.clone(),
            retry_count: task.retry_count,
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

/// Message body dispatched to the worker endpoint, and accepted by it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: DbId,
    pub retry_count: i32,
}
