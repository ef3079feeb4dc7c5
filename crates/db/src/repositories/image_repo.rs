//! Repository for the `images` table.

use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::Image;
use crate::models::status::ImageStatus;

/// Column list shared across `images` queries.
const COLUMNS: &str = "\
    id, prompt, style, status_id, tagging_confidence, error_message, \
    created_at, approved_at, updated_at";

/// Provides lifecycle operations for generated images.
pub struct ImageRepo;

impl ImageRepo {
    /// Claim the image id for a task, creating the image row on first call.
    ///
    /// Runs in a transaction that locks the task row: if the task already
    /// references an image (a prior attempt got this far), that image is
    /// returned; otherwise a fresh `processing` image is inserted and linked.
    /// This keeps object-store paths stable across retries and guarantees at
    /// most one image per task even under concurrent execution.
    pub async fn claim_for_task(
        pool: &PgPool,
        task_id: DbId,
        prompt: &str,
        style: &str,
    ) -> Result<Image, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: Option<DbId> =
            sqlx::query_scalar("SELECT image_id FROM tasks WHERE id = $1 FOR UPDATE")
                .bind(task_id)
                .fetch_one(&mut *tx)
                .await?;

        if let Some(image_id) = existing {
            let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
            let image = sqlx::query_as::<_, Image>(&query)
                .bind(image_id)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(image);
        }

        let insert = format!(
            "INSERT INTO images (prompt, style, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let image = sqlx::query_as::<_, Image>(&insert)
            .bind(prompt)
            .bind(style)
            .bind(ImageStatus::Processing.id())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE tasks SET image_id = $2 WHERE id = $1")
            .bind(task_id)
            .bind(image.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(image)
    }

    /// Find an image by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the generation cost reported by the provider.
    pub async fn set_generation_cost(
        pool: &PgPool,
        id: DbId,
        cost: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE images SET generation_cost = $2 WHERE id = $1")
            .bind(id)
            .bind(cost)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Advance the image to a new pipeline status.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: ImageStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE images SET status_id = $2 WHERE id = $1")
            .bind(id)
            .bind(status.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record tagging results on the image row.
    pub async fn set_tagging(
        pool: &PgPool,
        id: DbId,
        confidence: f64,
        cost: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE images SET tagging_confidence = $2, tagging_cost = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(confidence)
        .bind(cost)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Commit the image as ready for review.
    pub async fn mark_ready(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE images SET status_id = $2, error_message = NULL WHERE id = $1")
            .bind(id)
            .bind(ImageStatus::Ready.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a partial image rejected after a terminal task failure.
    ///
    /// Only images that never reached `ready` are touched; a completed
    /// task's image is not clawed back by a replayed failure.
    pub async fn mark_rejected(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE images SET status_id = $2, error_message = $3 \
             WHERE id = $1 AND status_id IN ($4, $5, $6)",
        )
        .bind(id)
        .bind(ImageStatus::Rejected.id())
        .bind(error_message)
        .bind(ImageStatus::Pending.id())
        .bind(ImageStatus::Processing.id())
        .bind(ImageStatus::Tagging.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Approve a ready image, stamping `approved_at`.
    ///
    /// Returns `false` when the image is not in `ready` status.
    pub async fn approve(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE images SET status_id = $2, approved_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(ImageStatus::Approved.id())
        .bind(ImageStatus::Ready.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an image row (cascades to variants, tags, description,
    /// colors, embedding; referencing tasks get `image_id = NULL`).
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List images awaiting review, newest first.
    pub async fn list_ready(pool: &PgPool, limit: i64) -> Result<Vec<Image>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM images \
             WHERE status_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(ImageStatus::Ready.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
