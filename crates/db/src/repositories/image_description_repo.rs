//! Repository for the `image_descriptions` table (one row per image).

use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::ImageDescription;

const COLUMNS: &str = "image_id, description, vision_analysis, model_version, generated_at";

/// Provides description operations for images.
pub struct ImageDescriptionRepo;

impl ImageDescriptionRepo {
    /// Insert or replace the description for an image.
    pub async fn upsert(
        pool: &PgPool,
        image_id: DbId,
        description: &str,
        vision_analysis: &serde_json::Value,
        model_version: &str,
    ) -> Result<ImageDescription, sqlx::Error> {
        let query = format!(
            "INSERT INTO image_descriptions \
                 (image_id, description, vision_analysis, model_version) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (image_id) DO UPDATE SET \
                 description = EXCLUDED.description, \
                 vision_analysis = EXCLUDED.vision_analysis, \
                 model_version = EXCLUDED.model_version \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageDescription>(&query)
            .bind(image_id)
            .bind(description)
            .bind(vision_analysis)
            .bind(model_version)
            .fetch_one(pool)
            .await
    }

    /// Fetch the description for an image, if any.
    pub async fn find_by_image(
        pool: &PgPool,
        image_id: DbId,
    ) -> Result<Option<ImageDescription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM image_descriptions WHERE image_id = $1");
        sqlx::query_as::<_, ImageDescription>(&query)
            .bind(image_id)
            .fetch_optional(pool)
            .await
    }
}
