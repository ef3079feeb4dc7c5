// All functions in this module are shared test helpers. Not every test
// binary uses every helper, so we suppress dead_code warnings here.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tower::ServiceExt;

use larder_api::config::{
    AppConfig, EngineConfig, EngineMode, ProviderConfig, QueueConfig, ServerConfig,
};
use larder_api::engine::{Dispatcher, TaskPipeline, TaskRoute, WorkerPool};
use larder_api::router::build_app_router;
use larder_api::state::AppState;
use larder_api::storage::LocalObjectStore;
use larder_db::models::job::Job;
use larder_db::models::task::TaskMessage;
use larder_db::repositories::JobRepo;
use larder_providers::ProviderRegistry;

/// Shared secret accepted by the worker endpoint in tests.
pub const TEST_SECRET: &str = "test-webhook-secret";

/// Build a test `AppConfig` with fast retry/poll timings and stub
/// providers. Each call gets a unique storage root.
pub fn test_config() -> AppConfig {
    let storage_path = std::env::temp_dir()
        .join(format!("larder-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();

    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["http://localhost:5173".to_string()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        },
        engine: EngineConfig {
            mode: EngineMode::InProcess,
            worker_concurrency: 2,
            max_retries: 3,
            task_budget_secs: 600,
            task_lease_secs: 900,
            generation_timeout_secs: 30,
            tagging_timeout_secs: 30,
            embedding_timeout_secs: 30,
            generation_poll_interval_ms: 5,
            retry_backoff_base_ms: 5,
            retry_backoff_cap_ms: 50,
            min_tag_confidence: 0.7,
        },
        queue: QueueConfig {
            name: "image-generation".to_string(),
            worker_url: "http://localhost:0/unused".to_string(),
            max_concurrent_dispatches: 5,
            max_dispatches_per_second: 100,
            webhook_secret: TEST_SECRET.to_string(),
        },
        providers: ProviderConfig {
            generation: "stub".to_string(),
            vision: "stub".to_string(),
            embedding: "stub".to_string(),
            openai_api_key: None,
        },
        storage_path,
    }
}

/// Wire the full engine in in-process mode against a test database.
///
/// Returns the state plus the undrained channel receiver; spawn a pool
/// with [`spawn_pool`] for end-to-end runs, or drop the receiver for
/// API-surface tests where tasks should stay pending.
pub fn build_state(
    pool: PgPool,
    registry: ProviderRegistry,
    config: AppConfig,
) -> (AppState, mpsc::UnboundedReceiver<TaskMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let route = TaskRoute::InProcess(tx);

    let storage = Arc::new(LocalObjectStore::new(config.storage_path.clone()));
    let pipeline = Arc::new(TaskPipeline::new(
        pool.clone(),
        registry,
        storage.clone(),
        config.engine.clone(),
        route.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(pool.clone(), route));

    let state = AppState {
        pool,
        config: Arc::new(config),
        dispatcher,
        pipeline,
        storage,
    };
    (state, rx)
}

/// Start the in-process worker pool for a state built by [`build_state`].
pub fn spawn_pool(
    state: &AppState,
    receiver: mpsc::UnboundedReceiver<TaskMessage>,
) -> WorkerPool {
    WorkerPool::spawn(
        state.config.engine.worker_concurrency,
        receiver,
        Arc::clone(&state.pipeline),
    )
}

/// Router over an all-stub engine with no running workers.
pub fn build_test_app(pool: PgPool) -> (Router, AppState) {
    let (state, _rx) = build_state(pool, ProviderRegistry::stubs(), test_config());
    (build_app_router(state.clone()), state)
}

/// Issue one JSON request against the router and decode the response.
pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    send_json_with_headers(app, method, uri, body, &[]).await
}

/// Same as [`send_json`] with extra request headers.
pub async fn send_json_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// Poll a job until it reaches a terminal status, panicking after
/// `timeout`.
pub async fn wait_for_terminal(pool: &PgPool, job_id: i64, timeout: Duration) -> Job {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = JobRepo::find_by_id(pool, job_id).await.unwrap().unwrap();
        if job.is_terminal() {
            return job;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "job {job_id} did not reach a terminal status within {timeout:?} \
                 (completed={}, failed={}, total={})",
                job.completed_tasks, job.failed_tasks, job.total_tasks
            );
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
