//! Progress aggregation: the only code path that mutates job counters.
//!
//! Callers must invoke [`record_outcome`] exactly once per terminal task
//! outcome; the guarded terminal writes in `TaskRepo` provide that
//! guarantee. The counter update itself is a single atomic UPDATE in
//! [`JobRepo::record_outcomes`], so concurrent completions are race-free.

use larder_core::types::DbId;
use larder_db::models::job::Job;
use larder_db::models::status::JobStatus;
use larder_db::repositories::JobRepo;
use larder_db::DbPool;

/// Record one terminal task outcome against its job.
pub async fn record_outcome(
    pool: &DbPool,
    job_id: DbId,
    completed: bool,
) -> Result<Job, sqlx::Error> {
    let (completed_delta, failed_delta) = if completed { (1, 0) } else { (0, 1) };
    let job = JobRepo::record_outcomes(pool, job_id, completed_delta, failed_delta).await?;
    log_if_terminal(&job);
    Ok(job)
}

/// Record a batch of cancellation failures (pending tasks failed when the
/// job was cancelled).
pub async fn record_cancelled(
    pool: &DbPool,
    job_id: DbId,
    failed_count: i32,
) -> Result<Job, sqlx::Error> {
    if failed_count == 0 {
        return JobRepo::find_by_id(pool, job_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound);
    }
    JobRepo::record_outcomes(pool, job_id, 0, failed_count).await
}

fn log_if_terminal(job: &Job) {
    if job.is_terminal() {
        tracing::info!(
            job_id = job.id,
            status = JobStatus::from_id(job.status_id)
                .map(JobStatus::name)
                .unwrap_or("unknown"),
            completed_tasks = job.completed_tasks,
            failed_tasks = job.failed_tasks,
            total_tasks = job.total_tasks,
            "Job reached terminal status",
        );
    }
}
