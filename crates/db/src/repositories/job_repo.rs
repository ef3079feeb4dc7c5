//! Repository for the `jobs` table.
//!
//! Uses `JobStatus` from `models::status` for all status transitions.
//! No magic numbers — every status literal is a named constant.

use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::Job;
use crate::models::status::{JobStatus, TaskStatus};
use crate::models::task::Task;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, status_id, total_tasks, completed_tasks, failed_tasks, \
    created_at, updated_at, completed_at";

/// Column list for `tasks` rows returned alongside job creation.
const TASK_COLUMNS: &str = "\
    id, job_id, prompt, style, status_id, image_id, error_message, \
    retry_count, created_at, started_at, completed_at";

/// Provides CRUD and counter operations for batch jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create one job plus its task rows in a single transaction.
    ///
    /// `prompts` are assumed validated and trimmed by the caller; the task
    /// count is `prompts.len() * count_per_prompt`. Failure before commit
    /// leaves no partial job.
    pub async fn create_with_tasks(
        pool: &PgPool,
        prompts: &[String],
        style: &str,
        count_per_prompt: i32,
    ) -> Result<(Job, Vec<Task>), sqlx::Error> {
        let total_tasks = prompts.len() as i32 * count_per_prompt;

        let mut tx = pool.begin().await?;

        let job_query = format!(
            "INSERT INTO jobs (status_id, total_tasks) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&job_query)
            .bind(JobStatus::Pending.id())
            .bind(total_tasks)
            .fetch_one(&mut *tx)
            .await?;

        let task_query = format!(
            "INSERT INTO tasks (job_id, prompt, style, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {TASK_COLUMNS}"
        );
        let mut tasks = Vec::with_capacity(total_tasks as usize);
        for prompt in prompts {
            for _ in 0..count_per_prompt {
                let task = sqlx::query_as::<_, Task>(&task_query)
                    .bind(job.id)
                    .bind(prompt)
                    .bind(style)
                    .bind(TaskStatus::Pending.id())
                    .fetch_one(&mut *tx)
                    .await?;
                tasks.push(task);
            }
        }

        tx.commit().await?;
        Ok((job, tasks))
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record terminal task outcomes against a job in one atomic update.
    ///
    /// Increments the counters, bumps `updated_at`, moves a pending job to
    /// running, and when the new counter sum reaches `total_tasks` stamps
    /// `completed_at` and derives the final status (failed when any task
    /// failed). A cancelled job's counters still move but its status and
    /// `completed_at` are left untouched.
    ///
    /// This is the only code path that writes job counters; the single
    /// UPDATE keeps concurrent task completions race-free.
    pub async fn record_outcomes(
        pool: &PgPool,
        job_id: DbId,
        completed_delta: i32,
        failed_delta: i32,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET \
                 completed_tasks = completed_tasks + $2, \
                 failed_tasks = failed_tasks + $3, \
                 status_id = CASE \
                     WHEN status_id = $4 THEN status_id \
                     WHEN completed_tasks + failed_tasks + $2 + $3 >= total_tasks THEN \
                         CASE WHEN failed_tasks + $3 > 0 THEN $5 ELSE $6 END \
                     ELSE $7 \
                 END, \
                 completed_at = CASE \
                     WHEN status_id <> $4 \
                          AND completed_tasks + failed_tasks + $2 + $3 >= total_tasks THEN NOW() \
                     ELSE completed_at \
                 END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .bind(completed_delta)
            .bind(failed_delta)
            .bind(JobStatus::Cancelled.id())
            .bind(JobStatus::Failed.id())
            .bind(JobStatus::Completed.id())
            .bind(JobStatus::Running.id())
            .fetch_one(pool)
            .await
    }

    /// Cancel a job if it is not already in a terminal state.
    ///
    /// Returns `true` if the job was cancelled, `false` if it had already
    /// completed, failed, or been cancelled.
    pub async fn cancel(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(job_id)
        .bind(JobStatus::Cancelled.id())
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List the most recently created jobs.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             ORDER BY created_at DESC \
             LIMIT $1"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
