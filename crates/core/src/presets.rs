//! Image size presets.
//!
//! The preset set is closed: every ready image has exactly one variant per
//! preset, and the object-store layout (`{image_id}/{preset}.jpg`) is keyed
//! by the preset name. Adding a preset requires a schema change.

use crate::error::CoreError;

/// JPEG quality used when encoding size variants.
pub const VARIANT_JPEG_QUALITY: u8 = 90;

/// A fixed output size for an image variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizePreset {
    Thumbnail,
    ProductCard,
    FullProduct,
    HeroImage,
    FullRes,
}

impl SizePreset {
    /// All presets, in pipeline order.
    pub const ALL: [SizePreset; 5] = [
        Self::Thumbnail,
        Self::ProductCard,
        Self::FullProduct,
        Self::HeroImage,
        Self::FullRes,
    ];

    /// Target dimensions as `(width, height)` in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Thumbnail => (150, 150),
            Self::ProductCard => (400, 300),
            Self::FullProduct => (800, 600),
            Self::HeroImage => (1920, 600),
            Self::FullRes => (2048, 2048),
        }
    }

    /// Stable name matching the `size_preset` column and storage layout.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::ProductCard => "product_card",
            Self::FullProduct => "full_product",
            Self::HeroImage => "hero_image",
            Self::FullRes => "full_res",
        }
    }

    /// Parse a preset from its stable name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "thumbnail" => Ok(Self::Thumbnail),
            "product_card" => Ok(Self::ProductCard),
            "full_product" => Ok(Self::FullProduct),
            "hero_image" => Ok(Self::HeroImage),
            "full_res" => Ok(Self::FullRes),
            other => Err(CoreError::Validation(format!(
                "Unknown size preset '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SizePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object-store path for one variant: `{image_id}/{preset}.jpg`.
pub fn variant_path(image_id: i64, preset: SizePreset) -> String {
    format!("{image_id}/{preset}.jpg")
}

/// Object-store prefix holding every variant of an image.
pub fn image_prefix(image_id: i64) -> String {
    format!("{image_id}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_dimensions_match_schema() {
        assert_eq!(SizePreset::Thumbnail.dimensions(), (150, 150));
        assert_eq!(SizePreset::ProductCard.dimensions(), (400, 300));
        assert_eq!(SizePreset::FullProduct.dimensions(), (800, 600));
        assert_eq!(SizePreset::HeroImage.dimensions(), (1920, 600));
        assert_eq!(SizePreset::FullRes.dimensions(), (2048, 2048));
    }

    #[test]
    fn preset_names_round_trip() {
        for preset in SizePreset::ALL {
            assert_eq!(SizePreset::from_name(preset.as_str()).unwrap(), preset);
        }
    }

    #[test]
    fn unknown_preset_rejected() {
        assert!(SizePreset::from_name("poster").is_err());
    }

    #[test]
    fn variant_path_layout() {
        assert_eq!(variant_path(42, SizePreset::Thumbnail), "42/thumbnail.jpg");
        assert_eq!(image_prefix(42), "42/");
    }
}
