pub mod health;
pub mod images;
pub mod jobs;
pub mod worker;

use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin/jobs", jobs::router())
        .nest("/admin/images", images::router())
        .nest("/admin/worker", worker::router())
}
