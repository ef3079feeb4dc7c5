//! Repository for the `image_embeddings` table.
//!
//! The `embedding` column uses pgvector's `vector(1536)` type. Because we
//! use runtime queries (no compile-time sqlx macros), vectors are passed as
//! text literals (e.g. `'[0.1, 0.2, ...]'`) and cast in SQL.

use larder_core::types::DbId;
use sqlx::PgPool;

/// Provides search-embedding operations for images.
pub struct ImageEmbeddingRepo;

impl ImageEmbeddingRepo {
    /// Insert or replace the embedding for an image.
    pub async fn upsert(
        pool: &PgPool,
        image_id: DbId,
        embedding: &[f32],
        embedding_source: &str,
        model_version: &str,
    ) -> Result<(), sqlx::Error> {
        let literal = format!(
            "[{}]",
            embedding
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        sqlx::query(
            "INSERT INTO image_embeddings \
                 (image_id, embedding, embedding_source, model_version) \
             VALUES ($1, $2::vector, $3, $4) \
             ON CONFLICT (image_id) DO UPDATE SET \
                 embedding = EXCLUDED.embedding, \
                 embedding_source = EXCLUDED.embedding_source, \
                 model_version = EXCLUDED.model_version",
        )
        .bind(image_id)
        .bind(&literal)
        .bind(embedding_source)
        .bind(model_version)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether an image has an embedding stored.
    pub async fn exists(pool: &PgPool, image_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM image_embeddings WHERE image_id = $1)")
            .bind(image_id)
            .fetch_one(pool)
            .await
    }

    /// Count embedding rows (test support for end-to-end assertions).
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM image_embeddings")
            .fetch_one(pool)
            .await
    }
}
