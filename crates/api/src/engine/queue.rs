//! Task routing for both deployment modes.
//!
//! In-process mode pushes task messages onto an unbounded channel drained
//! by the worker pool. External mode posts them to the configured worker
//! URL, paced by the queue's dispatch-rate and concurrency limits. Enqueue
//! failures are logged and the task stays pending; a reconciler may
//! re-enqueue it later.

use std::sync::Arc;
use std::time::Duration;

use larder_db::models::task::TaskMessage;
use tokio::sync::{mpsc, Semaphore};

use crate::config::QueueConfig;

/// Header carrying the shared secret on worker callbacks.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Where dispatched task messages go.
#[derive(Clone)]
pub enum TaskRoute {
    /// Channel drained by the in-process worker pool.
    InProcess(mpsc::UnboundedSender<TaskMessage>),
    /// External task queue invoking the worker endpoint.
    External(Arc<HttpTaskQueue>),
}

impl TaskRoute {
    /// Enqueue one message immediately.
    pub fn dispatch(&self, message: TaskMessage) {
        match self {
            Self::InProcess(tx) => {
                if tx.send(message).is_err() {
                    tracing::error!(
                        task_id = message.task_id,
                        "Worker channel closed; task stays pending",
                    );
                }
            }
            Self::External(queue) => {
                let queue = Arc::clone(queue);
                tokio::spawn(async move {
                    queue.post(message).await;
                });
            }
        }
    }

    /// Enqueue one message after `delay` (retry backoff).
    pub fn dispatch_after(&self, message: TaskMessage, delay: Duration) {
        let route = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            route.dispatch(message);
        });
    }

    /// Enqueue a batch without blocking the caller.
    ///
    /// In-process sends are effectively instant; external dispatch runs in
    /// a background task paced by the queue configuration.
    pub fn dispatch_batch(&self, messages: Vec<TaskMessage>) {
        match self {
            Self::InProcess(_) => {
                for message in messages {
                    self.dispatch(message);
                }
            }
            Self::External(queue) => {
                HttpTaskQueue::spawn_batch(queue, messages);
            }
        }
    }
}

/// HTTP dispatch client for external queue mode.
///
/// Posts `{task_id, retry_count}` JSON to the worker URL with the shared
/// secret header. Concurrency is bounded by a semaphore and dispatch rate
/// by a fixed inter-send interval.
pub struct HttpTaskQueue {
    client: reqwest::Client,
    queue_name: String,
    worker_url: String,
    webhook_secret: String,
    permits: Arc<Semaphore>,
    dispatch_interval: Duration,
}

impl HttpTaskQueue {
    pub fn new(config: &QueueConfig) -> Self {
        let per_second = config.max_dispatches_per_second.max(1);
        Self {
            client: reqwest::Client::new(),
            queue_name: config.name.clone(),
            worker_url: config.worker_url.clone(),
            webhook_secret: config.webhook_secret.clone(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_dispatches.max(1))),
            dispatch_interval: Duration::from_millis(1000 / u64::from(per_second)),
        }
    }

    /// Dispatch a batch from a background task, honoring rate and
    /// concurrency limits.
    pub fn spawn_batch(queue: &Arc<Self>, messages: Vec<TaskMessage>) {
        let queue = Arc::clone(queue);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(queue.dispatch_interval);
            for message in messages {
                ticker.tick().await;
                let permit = match Arc::clone(&queue.permits).acquire_owned().await {
                    Ok(permit) => permit,
                    // Semaphore is never closed while the queue is alive.
                    Err(_) => return,
                };
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let _permit = permit;
                    queue.post(message).await;
                });
            }
        });
    }

    /// Post one task message to the worker endpoint.
    pub async fn post(&self, message: TaskMessage) {
        let result = self
            .client
            .post(&self.worker_url)
            .header(WEBHOOK_SECRET_HEADER, &self.webhook_secret)
            .json(&message)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    task_id = message.task_id,
                    queue = %self.queue_name,
                    "Task dispatched to worker endpoint",
                );
            }
            Ok(response) => {
                tracing::error!(
                    task_id = message.task_id,
                    queue = %self.queue_name,
                    status = response.status().as_u16(),
                    "Worker endpoint rejected dispatch; task stays pending",
                );
            }
            Err(e) => {
                tracing::error!(
                    task_id = message.task_id,
                    queue = %self.queue_name,
                    error = %e,
                    "Failed to dispatch task; task stays pending",
                );
            }
        }
    }
}
