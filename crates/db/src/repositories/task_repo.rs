//! Repository for the `tasks` table.
//!
//! The claim and terminal-transition queries are written so that every
//! state change is a single guarded UPDATE: concurrent workers racing on
//! the same task id cannot both observe a successful transition.

use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::status::TaskStatus;
use crate::models::task::Task;

/// Column list shared across `tasks` queries.
const COLUMNS: &str = "\
    id, job_id, prompt, style, status_id, image_id, error_message, \
    retry_count, created_at, started_at, completed_at";

/// Provides execution-state operations for generation tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim a task for execution: `pending -> running`, stamping
    /// `started_at`.
    ///
    /// A task already `running` may be stolen when its claim is stale, i.e.
    /// `started_at` is older than `lease_secs` (the prior worker is presumed
    /// crashed). Returns `None` when the task is terminal, freshly claimed
    /// elsewhere, or missing; the caller inspects the row to distinguish.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        lease_secs: f64,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 \
               AND (status_id = $3 \
                    OR (status_id = $2 AND started_at < NOW() - make_interval(secs => $4))) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(TaskStatus::Running.id())
            .bind(TaskStatus::Pending.id())
            .bind(lease_secs)
            .fetch_optional(pool)
            .await
    }

    /// Reset a running task to pending for a retry, incrementing
    /// `retry_count` and clearing the previous attempt's fields.
    ///
    /// Guarded on `running` so racing workers cannot double-increment.
    /// Returns the updated row, or `None` when the task was not running.
    pub async fn reset_for_retry(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status_id = $2, retry_count = retry_count + 1, \
                 error_message = NULL, started_at = NULL \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(TaskStatus::Pending.id())
            .bind(TaskStatus::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a running task completed, storing the produced image id.
    ///
    /// Returns `true` only for the invocation that performed the terminal
    /// write; replays and racing workers get `false` and must not record
    /// the outcome again.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        image_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, image_id = $3, error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(TaskStatus::Completed.id())
        .bind(image_id)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a task failed with an error message.
    ///
    /// Accepts tasks in `running` or `pending` (a pending task is failed
    /// directly when its job was cancelled before it started). The image
    /// reference is cleared; the partial image itself is cleaned up by the
    /// caller. Same first-write contract as [`Self::mark_completed`].
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, error_message = $3, image_id = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5)",
        )
        .bind(id)
        .bind(TaskStatus::Failed.id())
        .bind(error_message)
        .bind(TaskStatus::Running.id())
        .bind(TaskStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail every still-pending task of a job (cancellation path).
    ///
    /// Returns the number of tasks affected so the caller can record the
    /// outcomes against the job counters.
    pub async fn fail_pending_for_job(
        pool: &PgPool,
        job_id: DbId,
        error_message: &str,
    ) -> Result<i32, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE job_id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(TaskStatus::Failed.id())
        .bind(error_message)
        .bind(TaskStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() as i32)
    }

    /// List all tasks of a job, oldest first.
    pub async fn list_by_job(pool: &PgPool, job_id: DbId) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE job_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Count tasks of a job currently in `running` status.
    pub async fn count_running(pool: &PgPool, job_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE job_id = $1 AND status_id = $2")
            .bind(job_id)
            .bind(TaskStatus::Running.id())
            .fetch_one(pool)
            .await
    }
}
