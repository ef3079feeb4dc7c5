//! Repository for the `image_variants` table.

use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::{CreateImageVariant, ImageVariant};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, image_id, size_preset, width, height, storage_path, file_size_bytes, created_at";

/// Provides CRUD operations for image size variants.
pub struct ImageVariantRepo;

impl ImageVariantRepo {
    /// Insert or refresh one variant row.
    ///
    /// Upserts on `(image_id, size_preset)` so a replayed upload after a
    /// crash converges on a single row per preset.
    pub async fn upsert(
        pool: &PgPool,
        image_id: DbId,
        input: &CreateImageVariant,
    ) -> Result<ImageVariant, sqlx::Error> {
        let query = format!(
            "INSERT INTO image_variants \
                 (image_id, size_preset, width, height, storage_path, file_size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (image_id, size_preset) DO UPDATE SET \
                 width = EXCLUDED.width, \
                 height = EXCLUDED.height, \
                 storage_path = EXCLUDED.storage_path, \
                 file_size_bytes = EXCLUDED.file_size_bytes \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageVariant>(&query)
            .bind(image_id)
            .bind(input.size_preset)
            .bind(input.width)
            .bind(input.height)
            .bind(&input.storage_path)
            .bind(input.file_size_bytes)
            .fetch_one(pool)
            .await
    }

    /// List all variants for an image, ordered by preset name.
    pub async fn list_by_image(
        pool: &PgPool,
        image_id: DbId,
    ) -> Result<Vec<ImageVariant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_variants \
             WHERE image_id = $1 \
             ORDER BY size_preset ASC"
        );
        sqlx::query_as::<_, ImageVariant>(&query)
            .bind(image_id)
            .fetch_all(pool)
            .await
    }

    /// Count variant rows for an image.
    pub async fn count_by_image(pool: &PgPool, image_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM image_variants WHERE image_id = $1")
            .bind(image_id)
            .fetch_one(pool)
            .await
    }
}
