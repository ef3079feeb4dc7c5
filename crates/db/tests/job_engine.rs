//! Integration tests for the job/task repositories: transactional
//! creation, atomic counter updates, claim semantics, and idempotent
//! satellite writes.

use larder_core::embedding::EMBEDDING_DIMENSION;
use larder_db::models::image::CreateImageVariant;
use larder_db::models::status::{ImageStatus, JobStatus, TaskStatus};
use larder_db::repositories::{
    ImageEmbeddingRepo, ImageRepo, ImageTagRepo, ImageVariantRepo, JobRepo, TaskRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LEASE_SECS: f64 = 900.0;

fn prompts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

async fn one_task_job(pool: &PgPool) -> (larder_db::models::job::Job, larder_db::models::task::Task)
{
    let (job, mut tasks) = JobRepo::create_with_tasks(pool, &prompts(&["a"]), "rustic", 1)
        .await
        .unwrap();
    (job, tasks.remove(0))
}

// ---------------------------------------------------------------------------
// Job + task creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_with_tasks_multiplies_counts(pool: PgPool) {
    let (job, tasks) = JobRepo::create_with_tasks(&pool, &prompts(&["a", "b"]), "artistic", 3)
        .await
        .unwrap();

    assert_eq!(job.total_tasks, 6);
    assert_eq!(job.completed_tasks, 0);
    assert_eq!(job.failed_tasks, 0);
    assert_eq!(job.status_id, JobStatus::Pending.id());
    assert!(job.completed_at.is_none());

    assert_eq!(tasks.len(), 6);
    for task in &tasks {
        assert_eq!(task.job_id, job.id);
        assert_eq!(task.status_id, TaskStatus::Pending.id());
        assert_eq!(task.retry_count, 0);
        assert_eq!(task.style, "artistic");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn single_prompt_single_count(pool: PgPool) {
    let (job, tasks) = JobRepo::create_with_tasks(&pool, &prompts(&["p"]), "rustic", 1)
        .await
        .unwrap();
    assert_eq!(job.total_tasks, 1);
    assert_eq!(tasks.len(), 1);
}

// ---------------------------------------------------------------------------
// Counter aggregation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_outcome_moves_job_to_running(pool: PgPool) {
    let (job, _) = JobRepo::create_with_tasks(&pool, &prompts(&["a", "b"]), "rustic", 1)
        .await
        .unwrap();

    let updated = JobRepo::record_outcomes(&pool, job.id, 1, 0).await.unwrap();
    assert_eq!(updated.status_id, JobStatus::Running.id());
    assert_eq!(updated.completed_tasks, 1);
    assert!(updated.completed_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn final_outcome_without_failures_completes_job(pool: PgPool) {
    let (job, _) = JobRepo::create_with_tasks(&pool, &prompts(&["a", "b"]), "rustic", 1)
        .await
        .unwrap();

    JobRepo::record_outcomes(&pool, job.id, 1, 0).await.unwrap();
    let updated = JobRepo::record_outcomes(&pool, job.id, 1, 0).await.unwrap();

    assert_eq!(updated.status_id, JobStatus::Completed.id());
    assert_eq!(updated.completed_tasks, 2);
    assert!(updated.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn any_failure_makes_terminal_job_failed(pool: PgPool) {
    let (job, _) = JobRepo::create_with_tasks(&pool, &prompts(&["a", "b"]), "rustic", 1)
        .await
        .unwrap();

    JobRepo::record_outcomes(&pool, job.id, 1, 0).await.unwrap();
    let updated = JobRepo::record_outcomes(&pool, job.id, 0, 1).await.unwrap();

    assert_eq!(updated.status_id, JobStatus::Failed.id());
    assert_eq!(updated.failed_tasks, 1);
    assert!(updated.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_outcomes_lose_no_updates(pool: PgPool) {
    let total = 8;
    let (job, _) = JobRepo::create_with_tasks(
        &pool,
        &prompts(&["a", "b", "c", "d", "e", "f", "g", "h"]),
        "rustic",
        1,
    )
    .await
    .unwrap();

    let mut updates = Vec::new();
    for _ in 0..total {
        updates.push(JobRepo::record_outcomes(&pool, job.id, 1, 0));
    }
    for result in futures::future::join_all(updates).await {
        result.unwrap();
    }

    let job = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.completed_tasks, total);
    assert_eq!(job.status_id, JobStatus::Completed.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_job_stays_cancelled_while_counters_move(pool: PgPool) {
    let (job, _) = JobRepo::create_with_tasks(&pool, &prompts(&["a", "b"]), "rustic", 1)
        .await
        .unwrap();

    assert!(JobRepo::cancel(&pool, job.id).await.unwrap());

    // In-flight outcomes still recorded, status pinned to cancelled.
    let updated = JobRepo::record_outcomes(&pool, job.id, 1, 1).await.unwrap();
    assert_eq!(updated.status_id, JobStatus::Cancelled.id());
    assert_eq!(updated.completed_tasks, 1);
    assert_eq!(updated.failed_tasks, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_is_rejected_on_terminal_jobs(pool: PgPool) {
    let (job, _) = one_task_job(&pool).await;

    JobRepo::record_outcomes(&pool, job.id, 1, 0).await.unwrap();
    assert!(!JobRepo::cancel(&pool, job.id).await.unwrap());

    let (job2, _) = one_task_job(&pool).await;
    assert!(JobRepo::cancel(&pool, job2.id).await.unwrap());
    assert!(!JobRepo::cancel(&pool, job2.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Task claim and terminal transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_moves_pending_to_running_once(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;

    let claimed = TaskRepo::claim(&pool, task.id, LEASE_SECS).await.unwrap();
    let claimed = claimed.expect("first claim succeeds");
    assert_eq!(claimed.status_id, TaskStatus::Running.id());
    assert!(claimed.started_at.is_some());

    // Fresh claim cannot be stolen.
    assert!(TaskRepo::claim(&pool, task.id, LEASE_SECS)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_claim_is_stolen(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;

    TaskRepo::claim(&pool, task.id, LEASE_SECS).await.unwrap();

    // Backdate the claim past the lease window.
    sqlx::query("UPDATE tasks SET started_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(task.id)
        .execute(&pool)
        .await
        .unwrap();

    let stolen = TaskRepo::claim(&pool, task.id, 900.0).await.unwrap();
    assert!(stolen.is_some(), "stale claim should be stealable");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn terminal_task_cannot_be_claimed(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    let image = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    TaskRepo::claim(&pool, task.id, LEASE_SECS).await.unwrap();
    assert!(TaskRepo::mark_completed(&pool, task.id, image.id)
        .await
        .unwrap());

    assert!(TaskRepo::claim(&pool, task.id, LEASE_SECS)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn terminal_write_happens_once(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    let image = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    TaskRepo::claim(&pool, task.id, LEASE_SECS).await.unwrap();
    assert!(TaskRepo::mark_completed(&pool, task.id, image.id)
        .await
        .unwrap());
    // Replay: no second terminal write.
    assert!(!TaskRepo::mark_completed(&pool, task.id, image.id)
        .await
        .unwrap());
    assert!(!TaskRepo::mark_failed(&pool, task.id, "late failure")
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_failed_clears_image_reference(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    TaskRepo::claim(&pool, task.id, LEASE_SECS).await.unwrap();
    assert!(TaskRepo::mark_failed(&pool, task.id, "provider_terminal: boom")
        .await
        .unwrap());

    let task = TaskRepo::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status_id, TaskStatus::Failed.id());
    assert!(task.image_id.is_none());
    assert_eq!(task.error_message.as_deref(), Some("provider_terminal: boom"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn retry_resets_to_pending_and_increments(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;

    TaskRepo::claim(&pool, task.id, LEASE_SECS).await.unwrap();
    let reset = TaskRepo::reset_for_retry(&pool, task.id)
        .await
        .unwrap()
        .expect("running task resets");

    assert_eq!(reset.status_id, TaskStatus::Pending.id());
    assert_eq!(reset.retry_count, 1);
    assert!(reset.started_at.is_none());

    // Only running tasks reset.
    assert!(TaskRepo::reset_for_retry(&pool, task.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fail_pending_for_job_spares_running_tasks(pool: PgPool) {
    let (job, tasks) = JobRepo::create_with_tasks(&pool, &prompts(&["a", "b", "c"]), "rustic", 1)
        .await
        .unwrap();

    TaskRepo::claim(&pool, tasks[0].id, LEASE_SECS).await.unwrap();

    let failed = TaskRepo::fail_pending_for_job(&pool, job.id, "cancelled: job cancelled")
        .await
        .unwrap();
    assert_eq!(failed, 2);

    let running = TaskRepo::find_by_id(&pool, tasks[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(running.status_id, TaskStatus::Running.id());
}

// ---------------------------------------------------------------------------
// Image ownership and idempotence
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn image_claim_is_stable_across_attempts(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;

    let first = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();
    let second = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.status_id, ImageStatus::Processing.id());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn variant_upsert_keeps_one_row_per_preset(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    let image = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    let variant = CreateImageVariant {
        size_preset: "thumbnail",
        width: 150,
        height: 150,
        storage_path: format!("{}/thumbnail.jpg", image.id),
        file_size_bytes: 100,
    };
    ImageVariantRepo::upsert(&pool, image.id, &variant).await.unwrap();

    let replayed = CreateImageVariant {
        file_size_bytes: 120,
        ..variant
    };
    ImageVariantRepo::upsert(&pool, image.id, &replayed).await.unwrap();

    assert_eq!(ImageVariantRepo::count_by_image(&pool, image.id).await.unwrap(), 1);
    let rows = ImageVariantRepo::list_by_image(&pool, image.id).await.unwrap();
    assert_eq!(rows[0].file_size_bytes, Some(120));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tags_are_deduplicated_per_image(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    let image = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    let tags = vec!["baked".to_string(), "cookies".to_string()];
    ImageTagRepo::insert_auto(&pool, image.id, &tags, 0.9).await.unwrap();
    ImageTagRepo::insert_auto(&pool, image.id, &tags, 0.9).await.unwrap();

    let stored = ImageTagRepo::list_by_image(&pool, image.id).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn embedding_upsert_round_trips(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    let image = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    let vector = vec![0.0f32; EMBEDDING_DIMENSION];
    ImageEmbeddingRepo::upsert(&pool, image.id, &vector, "prompt+tags+description", "test")
        .await
        .unwrap();
    // Replay converges to one row.
    ImageEmbeddingRepo::upsert(&pool, image.id, &vector, "prompt+tags+description", "test")
        .await
        .unwrap();

    assert!(ImageEmbeddingRepo::exists(&pool, image.id).await.unwrap());
    assert_eq!(ImageEmbeddingRepo::count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_image_nulls_task_reference(pool: PgPool) {
    let (_, task) = one_task_job(&pool).await;
    let image = ImageRepo::claim_for_task(&pool, task.id, &task.prompt, &task.style)
        .await
        .unwrap();

    assert!(ImageRepo::delete(&pool, image.id).await.unwrap());

    let task = TaskRepo::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert!(task.image_id.is_none());
}
