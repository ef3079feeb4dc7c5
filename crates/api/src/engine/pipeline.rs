//! The per-task work unit: generate -> variants -> upload -> tag -> embed
//! -> commit.
//!
//! `run` is safe to invoke concurrently on distinct task ids and idempotent
//! on the same id: the claim step hands a task to at most one live worker,
//! terminal tasks replay their stored outcome, and the image-id claim plus
//! path-stable uploads make re-execution after a crash converge on the same
//! image. Failures never cross the boundary as errors; they are classified
//! and either retried or recorded via the progress aggregator.

use std::sync::Arc;
use std::time::Duration;

use larder_core::embedding::{
    build_embedding_input, validate_embedding_dimension, EMBEDDING_SOURCE,
};
use larder_core::failure::FailureKind;
use larder_core::presets::variant_path;
use larder_core::retry::{delay_for_retry, should_retry};
use larder_core::style::build_generation_prompt;
use larder_core::types::DbId;
use larder_db::models::image::CreateImageVariant;
use larder_db::models::status::{ImageStatus, JobStatus, TaskStatus};
use larder_db::models::task::{Task, TaskMessage};
use larder_db::repositories::{
    ImageColorRepo, ImageDescriptionRepo, ImageEmbeddingRepo, ImageRepo, ImageTagRepo,
    ImageVariantRepo, JobRepo, TaskRepo,
};
use larder_db::DbPool;
use larder_providers::{GeneratedImage, GenerationOutput, PollStatus, ProviderRegistry};

use crate::config::EngineConfig;
use crate::storage::ObjectStore;

use super::queue::TaskRoute;
use super::{progress, variants, TaskFailure};

/// Master image dimensions requested from the generation provider.
const MASTER_WIDTH: u32 = 1024;
const MASTER_HEIGHT: u32 = 1024;

/// Upper bound on polls of an asynchronous generation provider.
const MAX_POLL_ATTEMPTS: u32 = 120;

/// Errors preventing the pipeline from being entered at all.
///
/// Everything past the entry point is captured as a [`TaskFailure`] and
/// reported through the task row, never through this error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Task {0} not found")]
    TaskNotFound(DbId),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone)]
pub enum TaskRunOutcome {
    Completed { image_id: Option<DbId> },
    Failed { kind: FailureKind, message: String },
    /// The attempt failed retryably and the task was re-enqueued.
    Retried { retry_count: i32 },
    /// Another worker holds a fresh claim on the task.
    Busy,
}

impl TaskRunOutcome {
    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Retried { .. } => "retried",
            Self::Busy => "busy",
        }
    }
}

/// Drives a single task through the generation pipeline.
pub struct TaskPipeline {
    pool: DbPool,
    providers: ProviderRegistry,
    storage: Arc<dyn ObjectStore>,
    config: EngineConfig,
    route: TaskRoute,
}

impl TaskPipeline {
    pub fn new(
        pool: DbPool,
        providers: ProviderRegistry,
        storage: Arc<dyn ObjectStore>,
        config: EngineConfig,
        route: TaskRoute,
    ) -> Self {
        Self {
            pool,
            providers,
            storage,
            config,
            route,
        }
    }

    /// Run one task to a terminal decision: completed, failed, retried, or
    /// busy elsewhere.
    pub async fn run(&self, task_id: DbId) -> Result<TaskRunOutcome, PipelineError> {
        let task = TaskRepo::find_by_id(&self.pool, task_id)
            .await?
            .ok_or(PipelineError::TaskNotFound(task_id))?;

        // Replayed deliveries of terminal tasks are no-ops.
        if task.is_terminal() {
            return Ok(self.replay_outcome(task_id).await?);
        }

        // A worker observing a cancelled job skips the pipeline and fails
        // the task without retries.
        let job = JobRepo::find_by_id(&self.pool, task.job_id)
            .await?
            .ok_or(PipelineError::TaskNotFound(task_id))?;
        if job.status_id == JobStatus::Cancelled.id() {
            let failure = TaskFailure::new(FailureKind::Cancelled, "job cancelled");
            return Ok(self.fail_task(&task, failure).await?);
        }

        // Claim: pending -> running, or steal a stale claim.
        let Some(claimed) = TaskRepo::claim(
            &self.pool,
            task_id,
            self.config.task_lease_secs as f64,
        )
        .await?
        else {
            return Ok(self.replay_outcome(task_id).await?);
        };

        // Total wall-clock budget covers all attempts, anchored at task
        // creation.
        let deadline =
            claimed.created_at + chrono::Duration::seconds(self.config.task_budget_secs as i64);
        let remaining = (deadline - chrono::Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            let failure = TaskFailure::new(
                FailureKind::Timeout,
                format!(
                    "task exceeded its {}s wall-clock budget",
                    self.config.task_budget_secs
                ),
            );
            return Ok(self.fail_task(&claimed, failure).await?);
        }

        let attempt = tokio::time::timeout(remaining, self.execute(&claimed)).await;
        let failure = match attempt {
            Ok(Ok(image_id)) => {
                return Ok(self.complete_task(&claimed, image_id).await?);
            }
            Ok(Err(failure)) => failure,
            Err(_elapsed) => TaskFailure::new(
                FailureKind::Timeout,
                format!(
                    "task exceeded its {}s wall-clock budget",
                    self.config.task_budget_secs
                ),
            ),
        };

        if should_retry(failure.kind, claimed.retry_count, self.config.max_retries) {
            return Ok(self.retry_task(&claimed, failure).await?);
        }

        Ok(self.fail_task(&claimed, failure).await?)
    }

    // -----------------------------------------------------------------------
    // Terminal transitions
    // -----------------------------------------------------------------------

    /// Replay the stored outcome of a task that could not be claimed.
    async fn replay_outcome(&self, task_id: DbId) -> Result<TaskRunOutcome, sqlx::Error> {
        let Some(task) = TaskRepo::find_by_id(&self.pool, task_id).await? else {
            // Deleted between claim attempt and replay; treat as busy.
            return Ok(TaskRunOutcome::Busy);
        };

        match TaskStatus::from_id(task.status_id) {
            Some(TaskStatus::Completed) => Ok(TaskRunOutcome::Completed {
                image_id: task.image_id,
            }),
            Some(TaskStatus::Failed) => Ok(TaskRunOutcome::Failed {
                kind: FailureKind::ProviderTerminal,
                message: task.error_message.unwrap_or_default(),
            }),
            // Freshly claimed by another worker, or reset to pending by a
            // concurrent retry.
            _ => Ok(TaskRunOutcome::Busy),
        }
    }

    async fn complete_task(
        &self,
        task: &Task,
        image_id: DbId,
    ) -> Result<TaskRunOutcome, sqlx::Error> {
        let first_write = TaskRepo::mark_completed(&self.pool, task.id, image_id).await?;
        if first_write {
            progress::record_outcome(&self.pool, task.job_id, true).await?;
            tracing::info!(
                task_id = task.id,
                job_id = task.job_id,
                image_id,
                retry_count = task.retry_count,
                "Task completed",
            );
        }
        Ok(TaskRunOutcome::Completed {
            image_id: Some(image_id),
        })
    }

    /// Reset the task to pending and re-enqueue it with backoff.
    ///
    /// The aggregator is not notified: a retried attempt is not a terminal
    /// outcome.
    async fn retry_task(
        &self,
        task: &Task,
        failure: TaskFailure,
    ) -> Result<TaskRunOutcome, sqlx::Error> {
        let Some(updated) = TaskRepo::reset_for_retry(&self.pool, task.id).await? else {
            // A concurrent worker already moved the task on.
            return Ok(TaskRunOutcome::Busy);
        };

        let delay = delay_for_retry(
            (updated.retry_count - 1).max(0) as u32,
            &self.config.backoff(),
        );
        tracing::warn!(
            task_id = task.id,
            job_id = task.job_id,
            retry_count = updated.retry_count,
            kind = %failure.kind,
            error = %failure.message,
            delay_ms = delay.as_millis() as u64,
            "Task attempt failed; retrying",
        );

        self.route.dispatch_after(
            TaskMessage {
                task_id: task.id,
                retry_count: updated.retry_count,
            },
            delay,
        );

        Ok(TaskRunOutcome::Retried {
            retry_count: updated.retry_count,
        })
    }

    async fn fail_task(
        &self,
        task: &Task,
        failure: TaskFailure,
    ) -> Result<TaskRunOutcome, sqlx::Error> {
        // Snapshot the image reference before the terminal write clears it.
        let partial_image_id = TaskRepo::find_by_id(&self.pool, task.id)
            .await?
            .and_then(|t| t.image_id);

        let stored = failure.stored_message();
        let first_write = TaskRepo::mark_failed(&self.pool, task.id, &stored).await?;
        if first_write {
            if let Some(image_id) = partial_image_id {
                ImageRepo::mark_rejected(&self.pool, image_id, &stored).await?;
            }
            progress::record_outcome(&self.pool, task.job_id, false).await?;
            tracing::warn!(
                task_id = task.id,
                job_id = task.job_id,
                kind = %failure.kind,
                error = %failure.message,
                "Task failed",
            );
        }

        Ok(TaskRunOutcome::Failed {
            kind: failure.kind,
            message: failure.message,
        })
    }

    // -----------------------------------------------------------------------
    // One attempt
    // -----------------------------------------------------------------------

    /// Execute one attempt end to end, returning the ready image's id.
    async fn execute(&self, task: &Task) -> Result<DbId, TaskFailure> {
        // Claim the image id first so object-store paths are stable across
        // attempts.
        let image = ImageRepo::claim_for_task(&self.pool, task.id, &task.prompt, &task.style)
            .await
            .map_err(TaskFailure::from)?;

        // Generate.
        let prompt = build_generation_prompt(&task.prompt, &task.style);
        let master = self.generate_master(&prompt).await?;
        if master.bytes.is_empty() {
            return Err(TaskFailure::terminal("Provider returned empty image data"));
        }
        ImageRepo::set_generation_cost(&self.pool, image.id, master.cost).await?;

        // Derive variants and sample the palette.
        let derived = variants::derive_variants(master.bytes.clone()).await?;

        // Upload: overwrite-by-path, one row per preset.
        for variant in &derived.variants {
            let path = variant_path(image.id, variant.preset);
            self.storage.put(&path, &variant.bytes).await?;
            ImageVariantRepo::upsert(
                &self.pool,
                image.id,
                &CreateImageVariant {
                    size_preset: variant.preset.as_str(),
                    width: variant.width as i32,
                    height: variant.height as i32,
                    storage_path: path,
                    file_size_bytes: variant.bytes.len() as i64,
                },
            )
            .await?;
        }

        // Tag.
        ImageRepo::set_status(&self.pool, image.id, ImageStatus::Tagging).await?;
        let analysis = tokio::time::timeout(
            Duration::from_secs(self.config.tagging_timeout_secs),
            self.providers.vision.analyze(&master.bytes, &task.prompt),
        )
        .await
        .map_err(|_| TaskFailure::transient("Tagging call timed out"))??;

        // Zero tags above the confidence threshold is not a failure; the
        // image stays searchable by description and prompt.
        if !analysis.tags.is_empty() && analysis.confidence >= self.config.min_tag_confidence {
            ImageTagRepo::insert_auto(&self.pool, image.id, &analysis.tags, analysis.confidence)
                .await?;
        }
        ImageDescriptionRepo::upsert(
            &self.pool,
            image.id,
            &analysis.description,
            &analysis.analysis,
            &analysis.model,
        )
        .await?;
        ImageColorRepo::replace(&self.pool, image.id, &derived.palette).await?;
        ImageRepo::set_tagging(&self.pool, image.id, analysis.confidence, analysis.cost).await?;

        // Embed.
        let input = build_embedding_input(
            &task.prompt,
            &analysis.description,
            &analysis.category,
            &analysis.tags,
        );
        let vector = tokio::time::timeout(
            Duration::from_secs(self.config.embedding_timeout_secs),
            self.providers.embedding.embed(&input),
        )
        .await
        .map_err(|_| TaskFailure::transient("Embedding call timed out"))??;
        validate_embedding_dimension(&vector)
            .map_err(|e| TaskFailure::terminal(e.to_string()))?;
        ImageEmbeddingRepo::upsert(
            &self.pool,
            image.id,
            &vector,
            EMBEDDING_SOURCE,
            self.providers.embedding.model(),
        )
        .await?;

        // Commit.
        ImageRepo::mark_ready(&self.pool, image.id).await?;
        Ok(image.id)
    }

    /// Call the generation adapter, polling asynchronous providers until
    /// terminal within the generation timeout.
    async fn generate_master(&self, prompt: &str) -> Result<GeneratedImage, TaskFailure> {
        let call_budget = Duration::from_secs(self.config.generation_timeout_secs);
        let started = tokio::time::Instant::now();

        let output = tokio::time::timeout(
            call_budget,
            self.providers
                .generation
                .generate(prompt, MASTER_WIDTH, MASTER_HEIGHT),
        )
        .await
        .map_err(|_| TaskFailure::transient("Generation call timed out"))??;

        let handle = match output {
            GenerationOutput::Image(image) => return Ok(image),
            GenerationOutput::Handle(handle) => handle,
        };

        let poll_interval = Duration::from_millis(self.config.generation_poll_interval_ms);
        for _attempt in 0..MAX_POLL_ATTEMPTS {
            let remaining = call_budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(TaskFailure::transient(
                    "Provider did not finish generation in time",
                ));
            }

            let status =
                tokio::time::timeout(remaining, self.providers.generation.poll(&handle))
                    .await
                    .map_err(|_| {
                        TaskFailure::transient("Provider did not finish generation in time")
                    })??;

            match status {
                PollStatus::Completed(image) => return Ok(image),
                PollStatus::Pending(_) => tokio::time::sleep(poll_interval).await,
            }
        }

        Err(TaskFailure::transient(
            "Provider exceeded the poll-attempt budget",
        ))
    }
}
