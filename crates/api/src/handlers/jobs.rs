//! Handlers for the `/admin/jobs` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use larder_core::error::CoreError;
use larder_core::types::DbId;
use larder_db::models::job::{Job, JobDetail, JobStatusView, SubmitBatch};
use larder_db::models::task::TaskView;
use larder_db::repositories::{JobRepo, TaskRepo};
use serde::Deserialize;

use crate::engine::progress;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Error message stored on tasks failed by a job cancellation.
const CANCELLED_MESSAGE: &str = "cancelled: job cancelled";

/// Query parameters for `GET /admin/jobs`.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
}

async fn find_job(pool: &sqlx::PgPool, job_id: DbId) -> AppResult<Job> {
    JobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

/// POST /api/v1/admin/jobs
///
/// Submit a batch of prompts. Returns 201 with the created job's status
/// projection; validation errors return 400 before anything is persisted.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitBatch>,
) -> AppResult<impl IntoResponse> {
    let job = state.dispatcher.submit(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: JobStatusView::from(&job),
        }),
    ))
}

/// GET /api/v1/admin/jobs
///
/// List recent jobs, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let jobs = JobRepo::list_recent(&state.pool, limit).await?;
    let views: Vec<JobStatusView> = jobs.iter().map(JobStatusView::from).collect();
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/admin/jobs/{id}/status
///
/// Poll-friendly job projection. Read-only.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, job_id).await?;
    Ok(Json(DataResponse {
        data: JobStatusView::from(&job),
    }))
}

/// GET /api/v1/admin/jobs/{id}
///
/// Full job detail including per-task rows (status, error message, image
/// reference, retry count).
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, job_id).await?;
    let tasks = TaskRepo::list_by_job(&state.pool, job_id).await?;

    Ok(Json(DataResponse {
        data: JobDetail {
            status: JobStatusView::from(&job),
            updated_at: job.updated_at,
            tasks: tasks.iter().map(TaskView::from).collect(),
        },
    }))
}

/// POST /api/v1/admin/jobs/{id}/cancel
///
/// Cancel a pending or running job. Pending tasks are failed immediately
/// and recorded; in-flight tasks finish and their outcomes are recorded
/// without moving the job out of `cancelled`. Returns 204 on success, 409
/// if the job is already terminal.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_job(&state.pool, job_id).await?;

    let cancelled = JobRepo::cancel(&state.pool, job_id).await?;
    if !cancelled {
        return Err(AppError::Core(CoreError::Conflict(
            "Job is already in a terminal state and cannot be cancelled".into(),
        )));
    }

    let failed = TaskRepo::fail_pending_for_job(&state.pool, job_id, CANCELLED_MESSAGE).await?;
    progress::record_cancelled(&state.pool, job_id, failed).await?;

    tracing::info!(job_id, failed_pending_tasks = failed, "Job cancelled");

    Ok(StatusCode::NO_CONTENT)
}
