//! The stateless worker endpoint invoked by the external task queue.
//!
//! Returns 2xx whenever the pipeline ran and the outcome was recorded —
//! including task-level failure, which is not a transport error. 5xx is
//! reserved for infrastructure failures that prevented the pipeline from
//! being entered, so the queue's own retry policy only re-delivers when
//! re-delivery can help.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use larder_core::error::CoreError;
use larder_core::types::DbId;
use larder_db::models::task::TaskMessage;
use serde::Serialize;

use crate::engine::pipeline::PipelineError;
use crate::engine::{TaskRunOutcome, WEBHOOK_SECRET_HEADER};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Response body for a processed task message.
#[derive(Debug, Serialize)]
pub struct ProcessTaskResponse {
    pub task_id: DbId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/v1/admin/worker/process-task
///
/// Body: `{task_id, retry_count}`. Requires the shared webhook secret.
pub async fn process_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<TaskMessage>,
) -> AppResult<impl IntoResponse> {
    verify_secret(&headers, &state.config.queue.webhook_secret)?;

    let outcome = state.pipeline.run(message.task_id).await.map_err(|e| match e {
        PipelineError::TaskNotFound(id) => AppError::Core(CoreError::NotFound {
            entity: "Task",
            id,
        }),
        PipelineError::Database(db) => AppError::Database(db),
    })?;

    let (image_id, error) = match &outcome {
        TaskRunOutcome::Completed { image_id } => (*image_id, None),
        TaskRunOutcome::Failed { message, .. } => (None, Some(message.clone())),
        _ => (None, None),
    };

    Ok(Json(ProcessTaskResponse {
        task_id: message.task_id,
        status: outcome.status_str(),
        image_id,
        error,
    }))
}

/// Reject callbacks lacking the shared secret.
fn verify_secret(headers: &HeaderMap, expected: &str) -> AppResult<()> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(secret) if secret == expected => Ok(()),
        _ => Err(AppError::Unauthorized(
            "Missing or invalid worker callback secret".into(),
        )),
    }
}
