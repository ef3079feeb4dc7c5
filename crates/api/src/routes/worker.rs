//! Route definitions for the worker callback.

use axum::routing::post;
use axum::Router;

use crate::handlers::worker;
use crate::state::AppState;

/// Routes mounted at `/admin/worker`.
///
/// ```text
/// POST   /process-task   -> process_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/process-task", post(worker::process_task))
}
