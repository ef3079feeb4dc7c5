use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{Dispatcher, TaskPipeline};
use crate::storage::ObjectStore;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: larder_db::DbPool,
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Batch submission entry point.
    pub dispatcher: Arc<Dispatcher>,
    /// Task pipeline, invoked by the worker endpoint.
    pub pipeline: Arc<TaskPipeline>,
    /// Object store holding image variants.
    pub storage: Arc<dyn ObjectStore>,
}
