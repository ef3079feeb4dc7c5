//! Route definitions for the `/admin/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/admin/jobs`.
///
/// ```text
/// GET    /               -> list_jobs
/// POST   /               -> submit_job
/// GET    /{id}           -> get_job
/// GET    /{id}/status    -> get_job_status
/// POST   /{id}/cancel    -> cancel_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/status", get(jobs::get_job_status))
        .route("/{id}/cancel", post(jobs::cancel_job))
}
