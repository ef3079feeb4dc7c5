//! Job execution engine.
//!
//! The dispatcher turns a batch submission into a job plus task rows and
//! routes each task to a worker; the pipeline drives one task through
//! generate -> variants -> upload -> tag -> embed -> commit; the progress
//! module owns the only code path that mutates job counters. Both
//! deployment modes (in-process pool, external queue) share the same
//! pipeline and aggregator.

pub mod dispatcher;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod variants;

pub use dispatcher::Dispatcher;
pub use pipeline::{TaskPipeline, TaskRunOutcome};
pub use pool::WorkerPool;
pub use queue::{HttpTaskQueue, TaskRoute, WEBHOOK_SECRET_HEADER};

use larder_core::failure::FailureKind;

/// A classified pipeline failure. Never crosses the pipeline boundary as
/// an `Err`; it is captured and either retried or recorded.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ProviderTransient, message)
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ProviderTerminal, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Infrastructure, message)
    }

    /// Error text persisted on the task row: `{kind}: {message}`.
    pub fn stored_message(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

impl From<larder_providers::ProviderError> for TaskFailure {
    fn from(err: larder_providers::ProviderError) -> Self {
        Self {
            kind: err.kind,
            message: err.message,
        }
    }
}

impl From<sqlx::Error> for TaskFailure {
    fn from(err: sqlx::Error) -> Self {
        Self::infrastructure(format!("Database error: {err}"))
    }
}

impl From<crate::storage::StorageError> for TaskFailure {
    fn from(err: crate::storage::StorageError) -> Self {
        Self::infrastructure(err.to_string())
    }
}
