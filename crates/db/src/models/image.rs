//! Image entity models: the core image row and its owned satellites
//! (variants, tags, description, colors, embedding metadata).

use larder_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{ImageStatus, StatusId};

/// A row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub prompt: String,
    pub style: String,
    pub status_id: StatusId,
    pub tagging_confidence: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Image {
    /// Lowercase status name for API responses.
    pub fn status_name(&self) -> &'static str {
        ImageStatus::from_id(self.status_id)
            .map(ImageStatus::name)
            .unwrap_or("unknown")
    }
}

/// A row from the `image_variants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageVariant {
    pub id: DbId,
    pub image_id: DbId,
    pub size_preset: String,
    pub width: i32,
    pub height: i32,
    pub storage_path: String,
    pub file_size_bytes: Option<i64>,
    pub created_at: Timestamp,
}

/// DTO for inserting or refreshing one variant row.
#[derive(Debug, Clone)]
pub struct CreateImageVariant {
    pub size_preset: &'static str,
    pub width: i32,
    pub height: i32,
    pub storage_path: String,
    pub file_size_bytes: i64,
}

/// A row from the `image_tags` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageTag {
    pub image_id: DbId,
    pub tag: String,
    pub confidence: f64,
    pub source: String,
    pub created_at: Timestamp,
}

/// A row from the `image_descriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageDescription {
    pub image_id: DbId,
    pub description: String,
    pub vision_analysis: Option<serde_json::Value>,
    pub model_version: Option<String>,
    pub generated_at: Timestamp,
}

/// A row from the `image_colors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageColor {
    pub image_id: DbId,
    pub color_hex: String,
    pub percentage: f64,
    pub is_dominant: bool,
}

/// Request body for `POST /api/v1/admin/images/{id}/approve`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveImage {
    pub override_tags: Option<Vec<String>>,
}

/// Review-queue projection: image plus its tags and description.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewImage {
    pub id: DbId,
    pub prompt: String,
    pub style: String,
    pub status: &'static str,
    pub tagging_confidence: Option<f64>,
    pub description: Option<String>,
    pub tags: Vec<ImageTag>,
    pub created_at: Timestamp,
}
