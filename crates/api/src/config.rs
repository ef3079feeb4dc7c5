//! Application configuration loaded from environment variables.
//!
//! All fields have sensible defaults suitable for local development.
//! In production, override via environment variables.

use std::time::Duration;

use larder_core::retry::BackoffConfig;

/// How tasks reach workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// A fixed pool of in-process workers drains a channel.
    InProcess,
    /// An external task queue invokes the worker endpoint over HTTP.
    External,
}

impl EngineMode {
    fn from_env() -> Self {
        match std::env::var("ENGINE_MODE").as_deref() {
            Ok("external") => Self::External,
            Ok("in_process") | Err(_) => Self::InProcess,
            Ok(other) => panic!("ENGINE_MODE must be 'in_process' or 'external', got '{other}'"),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown grace period in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
}

/// Job-engine settings shared by both deployment modes.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: EngineMode,
    /// Worker routines in in-process mode (default: `5`).
    pub worker_concurrency: usize,
    /// Retry budget per task for retryable failures (default: `3`).
    pub max_retries: i32,
    /// Total wall-clock budget per task across all attempts (default: `600`).
    pub task_budget_secs: u64,
    /// Age after which a running task's claim may be stolen (default: `900`).
    pub task_lease_secs: u64,
    pub generation_timeout_secs: u64,
    pub tagging_timeout_secs: u64,
    pub embedding_timeout_secs: u64,
    /// Interval between polls of an asynchronous generation provider.
    pub generation_poll_interval_ms: u64,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_cap_ms: u64,
    /// Tags below this tagging confidence are not persisted.
    pub min_tag_confidence: f64,
}

impl EngineConfig {
    /// Backoff parameters for retry scheduling.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            base: Duration::from_millis(self.retry_backoff_base_ms),
            cap: Duration::from_millis(self.retry_backoff_cap_ms),
            ..BackoffConfig::default()
        }
    }
}

/// External task-queue settings (external mode only, except for the
/// webhook secret which also guards the worker endpoint).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: String,
    /// Dispatch target URL for task messages.
    pub worker_url: String,
    pub max_concurrent_dispatches: usize,
    pub max_dispatches_per_second: u32,
    /// Shared secret required on inbound worker callbacks.
    pub webhook_secret: String,
}

/// Provider adapter selection.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub generation: String,
    pub vision: String,
    pub embedding: String,
    pub openai_api_key: Option<String>,
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub queue: QueueConfig,
    pub providers: ProviderConfig,
    /// Object-store root for local storage.
    pub storage_path: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = env_or(name, default);
    raw.parse()
        .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}"))
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: parse_env("PORT", "3000"),
                cors_origins,
                request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", "30"),
                shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", "30"),
            },
            engine: EngineConfig {
                mode: EngineMode::from_env(),
                worker_concurrency: parse_env("WORKER_CONCURRENCY", "5"),
                max_retries: parse_env("MAX_RETRIES", "3"),
                task_budget_secs: parse_env("TASK_BUDGET_SECS", "600"),
                task_lease_secs: parse_env("TASK_LEASE_SECS", "900"),
                generation_timeout_secs: parse_env("GENERATION_TIMEOUT_SECS", "120"),
                tagging_timeout_secs: parse_env("TAGGING_TIMEOUT_SECS", "60"),
                embedding_timeout_secs: parse_env("EMBEDDING_TIMEOUT_SECS", "30"),
                generation_poll_interval_ms: parse_env("GENERATION_POLL_INTERVAL_MS", "2000"),
                retry_backoff_base_ms: parse_env("RETRY_BACKOFF_BASE_MS", "500"),
                retry_backoff_cap_ms: parse_env("RETRY_BACKOFF_CAP_MS", "30000"),
                min_tag_confidence: parse_env("MIN_TAG_CONFIDENCE", "0.7"),
            },
            queue: QueueConfig {
                name: env_or("QUEUE_NAME", "image-generation"),
                worker_url: env_or(
                    "QUEUE_WORKER_URL",
                    "http://localhost:3000/api/v1/admin/worker/process-task",
                ),
                max_concurrent_dispatches: parse_env("QUEUE_MAX_CONCURRENT_DISPATCHES", "5"),
                max_dispatches_per_second: parse_env("QUEUE_MAX_DISPATCHES_PER_SECOND", "10"),
                webhook_secret: env_or("WEBHOOK_SECRET", "dev-webhook-secret"),
            },
            providers: ProviderConfig {
                generation: env_or("GENERATION_PROVIDER", "openai"),
                vision: env_or("VISION_PROVIDER", "openai"),
                embedding: env_or("EMBEDDING_PROVIDER", "openai"),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            },
            storage_path: env_or("STORAGE_PATH", "./storage"),
        }
    }
}
