//! API-surface tests for the `/admin/jobs` resource.

mod common;

use axum::http::{Method, StatusCode};
use common::{build_test_app, send_json};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_empty_prompt_list_returns_400_without_rows(pool: PgPool) {
    let (app, _state) = build_test_app(pool.clone());

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("prompts"));

    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(jobs, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_whitespace_prompt_rejected(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["cookies", "   "] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_unknown_style_rejected(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["cookies"], "style": "noir" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_zero_count_per_prompt_rejected(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["cookies"], "count_per_prompt": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_returns_created_job_descriptor(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["sourdough", "bagels"], "count_per_prompt": 2 })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["status"], "pending");
    assert_eq!(data["total_tasks"], 4);
    assert_eq!(data["completed_tasks"], 0);
    assert_eq!(data["failed_tasks"], 0);
    assert_eq!(data["progress_percentage"], 0.0);
    assert!(data["id"].as_i64().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_of_unknown_job_is_404(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (status, _) = send_json(&app, Method::GET, "/api/v1/admin/jobs/999/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&app, Method::GET, "/api/v1/admin/jobs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_endpoint_is_read_only_projection(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (_, created) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["cookies"] })),
    )
    .await;
    let job_id = created["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/admin/jobs/{job_id}/status");
    let (status, body) = send_json(&app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["id"].as_i64().unwrap(), job_id);
    assert_eq!(data["status"], "pending");
    assert_eq!(data["total_tasks"], 1);
    assert!(data["completed_at"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn job_detail_includes_task_rows(pool: PgPool) {
    let (app, _state) = build_test_app(pool);

    let (_, created) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["cookies", "muffins"] })),
    )
    .await;
    let job_id = created["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/admin/jobs/{job_id}");
    let (status, body) = send_json(&app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    let tasks = body["data"]["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["status"], "pending");
    assert_eq!(tasks[0]["retry_count"], 0);
    assert!(tasks[0]["image_id"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_fails_pending_tasks_and_pins_status(pool: PgPool) {
    let (app, _state) = build_test_app(pool.clone());

    let (_, created) = send_json(
        &app,
        Method::POST,
        "/api/v1/admin/jobs",
        Some(json!({ "prompts": ["a", "b", "c"] })),
    )
    .await;
    let job_id = created["data"]["id"].as_i64().unwrap();

    let cancel_uri = format!("/api/v1/admin/jobs/{job_id}/cancel");
    let (status, _) = send_json(&app, Method::POST, &cancel_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status_uri = format!("/api/v1/admin/jobs/{job_id}/status");
    let (_, body) = send_json(&app, Method::GET, &status_uri, None).await;
    let data = &body["data"];
    assert_eq!(data["status"], "cancelled");
    assert_eq!(data["failed_tasks"], 3);
    assert_eq!(data["progress_percentage"], 100.0);
    assert!(!data["completed_at"].is_null());

    // Cancelling again conflicts.
    let (status, _) = send_json(&app, Method::POST, &cancel_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
