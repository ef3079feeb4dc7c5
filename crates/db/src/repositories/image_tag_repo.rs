//! Repository for the `image_tags` table.

use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::ImageTag;

const COLUMNS: &str = "image_id, tag, confidence, source, created_at";

/// Tag source for pipeline-generated tags.
const SOURCE_AUTO: &str = "auto";

/// Tag source for operator-supplied overrides.
const SOURCE_MANUAL: &str = "manual";

/// Provides tag operations for images.
pub struct ImageTagRepo;

impl ImageTagRepo {
    /// Insert auto-generated tags, deduplicated per image.
    ///
    /// Conflicting rows are left untouched so a replayed task neither
    /// duplicates nor clobbers tags written by an earlier attempt.
    pub async fn insert_auto(
        pool: &PgPool,
        image_id: DbId,
        tags: &[String],
        confidence: f64,
    ) -> Result<(), sqlx::Error> {
        for tag in tags {
            sqlx::query(
                "INSERT INTO image_tags (image_id, tag, confidence, source) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (image_id, tag) DO NOTHING",
            )
            .bind(image_id)
            .bind(tag)
            .bind(confidence)
            .bind(SOURCE_AUTO)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Replace all tags of an image with operator-supplied manual tags.
    pub async fn replace_with_manual(
        pool: &PgPool,
        image_id: DbId,
        tags: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM image_tags WHERE image_id = $1")
            .bind(image_id)
            .execute(&mut *tx)
            .await?;

        for tag in tags {
            sqlx::query(
                "INSERT INTO image_tags (image_id, tag, confidence, source) \
                 VALUES ($1, $2, 1.0, $3) \
                 ON CONFLICT (image_id, tag) DO NOTHING",
            )
            .bind(image_id)
            .bind(tag)
            .bind(SOURCE_MANUAL)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List tags for an image, alphabetically.
    pub async fn list_by_image(pool: &PgPool, image_id: DbId) -> Result<Vec<ImageTag>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_tags \
             WHERE image_id = $1 \
             ORDER BY tag ASC"
        );
        sqlx::query_as::<_, ImageTag>(&query)
            .bind(image_id)
            .fetch_all(pool)
            .await
    }
}
