use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use larder_api::config::{AppConfig, EngineMode};
use larder_api::engine::{Dispatcher, HttpTaskQueue, TaskPipeline, TaskRoute, WorkerPool};
use larder_api::router::build_app_router;
use larder_api::state::AppState;
use larder_api::storage::LocalObjectStore;
use larder_providers::ProviderRegistry;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        mode = ?config.engine.mode,
        "Loaded configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = larder_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    larder_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    larder_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Object store ---
    let storage = Arc::new(LocalObjectStore::new(config.storage_path.clone()));

    // --- Providers ---
    let providers = ProviderRegistry::from_names(
        &config.providers.generation,
        &config.providers.vision,
        &config.providers.embedding,
        config.providers.openai_api_key.as_deref(),
    )
    .expect("Invalid provider configuration");

    // --- Engine ---
    let (route, receiver) = match config.engine.mode {
        EngineMode::InProcess => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            (TaskRoute::InProcess(tx), Some(rx))
        }
        EngineMode::External => (
            TaskRoute::External(Arc::new(HttpTaskQueue::new(&config.queue))),
            None,
        ),
    };

    let pipeline = Arc::new(TaskPipeline::new(
        pool.clone(),
        providers,
        storage.clone(),
        config.engine.clone(),
        route.clone(),
    ));

    let worker_pool = receiver.map(|rx| {
        tracing::info!(
            worker_concurrency = config.engine.worker_concurrency,
            "Starting in-process worker pool",
        );
        WorkerPool::spawn(config.engine.worker_concurrency, rx, Arc::clone(&pipeline))
    });

    let dispatcher = Arc::new(Dispatcher::new(pool.clone(), route));

    // --- App state ---
    let shutdown_grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        dispatcher,
        pipeline,
        storage,
    };

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.server.host.parse().expect("Invalid HOST address"),
        config.server.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(pool) = worker_pool {
        pool.shutdown(shutdown_grace).await;
        tracing::info!("Worker pool drained");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
