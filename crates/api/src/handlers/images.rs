//! Admin handlers for the image review workflow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use larder_core::error::CoreError;
use larder_core::presets::image_prefix;
use larder_core::types::DbId;
use larder_db::models::image::{ApproveImage, ReviewImage};
use larder_db::repositories::{ImageDescriptionRepo, ImageRepo, ImageTagRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::ObjectStore;

/// Query parameters for `GET /admin/images/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    /// Maximum number of results. Defaults to 20, capped at 100.
    pub limit: Option<i64>,
}

/// GET /api/v1/admin/images/review
///
/// Images in `ready` status awaiting review, newest first, with their
/// tags and description.
pub async fn list_review_queue(
    State(state): State<AppState>,
    Query(params): Query<ReviewQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let images = ImageRepo::list_ready(&state.pool, limit).await?;

    let mut review = Vec::with_capacity(images.len());
    for image in &images {
        let tags = ImageTagRepo::list_by_image(&state.pool, image.id).await?;
        let description = ImageDescriptionRepo::find_by_image(&state.pool, image.id)
            .await?
            .map(|d| d.description);

        review.push(ReviewImage {
            id: image.id,
            prompt: image.prompt.clone(),
            style: image.style.clone(),
            status: image.status_name(),
            tagging_confidence: image.tagging_confidence,
            description,
            tags,
            created_at: image.created_at,
        });
    }

    Ok(Json(DataResponse { data: review }))
}

/// POST /api/v1/admin/images/{id}/approve
///
/// Approve a ready image for the search index, optionally replacing its
/// tags with manual ones. Returns 409 when the image is not in `ready`.
pub async fn approve_image(
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    input: Option<Json<ApproveImage>>,
) -> AppResult<impl IntoResponse> {
    let image = ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    let input = input.map(|Json(body)| body).unwrap_or_default();
    if let Some(tags) = &input.override_tags {
        ImageTagRepo::replace_with_manual(&state.pool, image.id, tags).await?;
    }

    let approved = ImageRepo::approve(&state.pool, image_id).await?;
    if !approved {
        return Err(AppError::Core(CoreError::Conflict(
            "Only ready images can be approved".into(),
        )));
    }

    tracing::info!(image_id, "Image approved");

    Ok(Json(DataResponse {
        data: serde_json::json!({ "image_id": image_id, "status": "approved" }),
    }))
}

/// DELETE /api/v1/admin/images/{id}
///
/// Delete an image row (cascading to its satellites) and its variant
/// objects. A storage failure is logged but does not abort the delete.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    if let Err(e) = state.storage.delete_prefix(&image_prefix(image_id)).await {
        tracing::warn!(
            image_id,
            error = %e,
            "Could not delete image objects from storage (row delete proceeds)",
        );
    }

    ImageRepo::delete(&state.pool, image_id).await?;

    tracing::info!(image_id, "Image deleted");

    Ok(StatusCode::NO_CONTENT)
}
