//! Repository for the `image_colors` table.

use larder_core::palette::ColorShare;
use larder_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::ImageColor;

const COLUMNS: &str = "image_id, color_hex, percentage, is_dominant";

/// Provides color-palette operations for images.
pub struct ImageColorRepo;

impl ImageColorRepo {
    /// Replace the stored palette for an image.
    ///
    /// Delete-then-insert in one transaction so a replayed task leaves a
    /// single coherent palette.
    pub async fn replace(
        pool: &PgPool,
        image_id: DbId,
        colors: &[ColorShare],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM image_colors WHERE image_id = $1")
            .bind(image_id)
            .execute(&mut *tx)
            .await?;

        for color in colors {
            sqlx::query(
                "INSERT INTO image_colors (image_id, color_hex, percentage, is_dominant) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (image_id, color_hex) DO NOTHING",
            )
            .bind(image_id)
            .bind(&color.hex)
            .bind(color.percentage)
            .bind(color.is_dominant)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// List the palette for an image, dominant color first.
    pub async fn list_by_image(
        pool: &PgPool,
        image_id: DbId,
    ) -> Result<Vec<ImageColor>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM image_colors \
             WHERE image_id = $1 \
             ORDER BY percentage DESC"
        );
        sqlx::query_as::<_, ImageColor>(&query)
            .bind(image_id)
            .fetch_all(pool)
            .await
    }
}
