//! Route definitions for the `/admin/images` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/admin/images`.
///
/// ```text
/// GET    /review         -> list_review_queue
/// POST   /{id}/approve   -> approve_image
/// DELETE /{id}           -> delete_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/review", get(images::list_review_queue))
        .route("/{id}/approve", post(images::approve_image))
        .route("/{id}", delete(images::delete_image))
}
