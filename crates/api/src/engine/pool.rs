//! Fixed-size in-process worker pool.
//!
//! N workers drain one shared channel; each worker runs the pipeline
//! sequentially, so the pool size alone bounds concurrency. Backpressure
//! comes from the bounded worker count, not a bounded channel. Shutdown is
//! cooperative: workers finish their current task, and the pool waits up
//! to a grace period before abandoning them.

use std::sync::Arc;
use std::time::Duration;

use larder_db::models::task::TaskMessage;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::pipeline::TaskPipeline;

/// Handle to the spawned workers.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `concurrency` workers draining `receiver`.
    pub fn spawn(
        concurrency: usize,
        receiver: mpsc::UnboundedReceiver<TaskMessage>,
        pipeline: Arc<TaskPipeline>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..concurrency.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let pipeline = Arc::clone(&pipeline);
                let cancel = cancel.clone();
                tokio::spawn(run_worker(worker_id, receiver, pipeline, cancel))
            })
            .collect();

        Self { workers, cancel }
    }

    /// Signal shutdown and wait up to `grace` for workers to finish their
    /// current task.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();
        for worker in self.workers {
            if tokio::time::timeout(grace, worker).await.is_err() {
                tracing::warn!("Worker did not stop within the grace period");
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<TaskMessage>>>,
    pipeline: Arc<TaskPipeline>,
    cancel: CancellationToken,
) {
    tracing::info!(worker_id, "Worker started");

    loop {
        // Hold the channel lock only while waiting for the next message;
        // processing happens after it is released so other workers can
        // dequeue concurrently.
        let message = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = rx.recv() => message,
            }
        };

        let Some(message) = message else {
            // Channel closed: the dispatcher is gone.
            break;
        };

        match pipeline.run(message.task_id).await {
            Ok(outcome) => {
                tracing::debug!(
                    worker_id,
                    task_id = message.task_id,
                    outcome = outcome.status_str(),
                    "Worker finished task",
                );
            }
            Err(e) => {
                tracing::error!(
                    worker_id,
                    task_id = message.task_id,
                    error = %e,
                    "Worker could not enter the pipeline",
                );
            }
        }
    }

    tracing::info!(worker_id, "Worker stopped");
}
