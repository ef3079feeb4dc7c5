//! Batch submission: validate, persist job + tasks transactionally, then
//! enqueue each task exactly once on the configured route.

use larder_core::error::CoreError;
use larder_core::style::{validate_style, DEFAULT_STYLE};
use larder_db::models::job::{Job, SubmitBatch};
use larder_db::models::task::TaskMessage;
use larder_db::repositories::JobRepo;
use larder_db::DbPool;

use crate::error::{AppError, AppResult};

use super::queue::TaskRoute;

/// Accepts batch submissions and fans them out to workers.
///
/// The dispatcher never runs pipeline work itself; it only persists and
/// routes.
pub struct Dispatcher {
    pool: DbPool,
    route: TaskRoute,
}

impl Dispatcher {
    pub fn new(pool: DbPool, route: TaskRoute) -> Self {
        Self { pool, route }
    }

    /// Create a job with `len(prompts) * count_per_prompt` tasks and
    /// enqueue them.
    ///
    /// Validation failures surface synchronously before any persistence;
    /// enqueue failures are logged by the route and leave tasks pending.
    pub async fn submit(&self, input: &SubmitBatch) -> AppResult<Job> {
        let prompts = validate_prompts(&input.prompts)?;

        let style = match input.style.as_deref() {
            None | Some("") => DEFAULT_STYLE.to_string(),
            Some(style) => {
                validate_style(style)?;
                style.to_string()
            }
        };

        let count_per_prompt = input.count_per_prompt.unwrap_or(1);
        if count_per_prompt < 1 {
            return Err(AppError::Core(CoreError::Validation(
                "count_per_prompt must be at least 1".into(),
            )));
        }

        let (job, tasks) =
            JobRepo::create_with_tasks(&self.pool, &prompts, &style, count_per_prompt).await?;

        tracing::info!(
            job_id = job.id,
            total_tasks = job.total_tasks,
            style = %style,
            "Job submitted",
        );

        let messages = tasks
            .iter()
            .map(|task| TaskMessage {
                task_id: task.id,
                retry_count: 0,
            })
            .collect();
        self.route.dispatch_batch(messages);

        Ok(job)
    }
}

/// Trim all prompts and reject empty input.
fn validate_prompts(prompts: &[String]) -> Result<Vec<String>, CoreError> {
    if prompts.is_empty() {
        return Err(CoreError::Validation("prompts must not be empty".into()));
    }

    let trimmed: Vec<String> = prompts.iter().map(|p| p.trim().to_string()).collect();
    if trimmed.iter().any(String::is_empty) {
        return Err(CoreError::Validation(
            "prompts must not contain empty entries".into(),
        ));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_list_rejected() {
        assert!(validate_prompts(&[]).is_err());
    }

    #[test]
    fn whitespace_only_prompt_rejected() {
        assert!(validate_prompts(&["  ".to_string()]).is_err());
    }

    #[test]
    fn prompts_are_trimmed() {
        let prompts = validate_prompts(&["  sourdough  ".to_string()]).unwrap();
        assert_eq!(prompts, vec!["sourdough".to_string()]);
    }
}
