//! Size-variant derivation and palette sampling.
//!
//! The master image is decoded once; each preset is produced by
//! center-crop-then-fit to the target aspect ratio (Lanczos3) and encoded
//! as JPEG quality 90. Decoding and resizing are CPU-bound and run on the
//! blocking pool so they stay off the I/O executor.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use larder_core::failure::FailureKind;
use larder_core::palette::{extract_palette, ColorShare};
use larder_core::presets::{SizePreset, VARIANT_JPEG_QUALITY};

use super::TaskFailure;

/// Colors sampled from the master image.
const PALETTE_SIZE: usize = 5;

/// Edge length of the downsampled image used for palette extraction.
const PALETTE_SAMPLE_EDGE: u32 = 64;

/// One encoded variant ready for upload.
#[derive(Debug)]
pub struct VariantImage {
    pub preset: SizePreset,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Output of the CPU-bound derivation step.
#[derive(Debug)]
pub struct DerivedVariants {
    pub variants: Vec<VariantImage>,
    pub palette: Vec<ColorShare>,
}

/// Decode the master once and derive every preset plus the color palette.
///
/// A decode or encode failure means the provider handed back a malformed
/// image and is terminal for the task.
pub async fn derive_variants(master: Vec<u8>) -> Result<DerivedVariants, TaskFailure> {
    tokio::task::spawn_blocking(move || derive_sync(&master))
        .await
        .map_err(|e| {
            TaskFailure::new(
                FailureKind::Infrastructure,
                format!("Variant worker panicked: {e}"),
            )
        })?
}

fn derive_sync(master: &[u8]) -> Result<DerivedVariants, TaskFailure> {
    let decoded = image::load_from_memory(master)
        .map_err(|e| TaskFailure::terminal(format!("Could not decode master image: {e}")))?;

    let sample = decoded
        .thumbnail(PALETTE_SAMPLE_EDGE, PALETTE_SAMPLE_EDGE)
        .to_rgb8();
    let pixels: Vec<[u8; 3]> = sample.pixels().map(|p| p.0).collect();
    let palette = extract_palette(&pixels, PALETTE_SIZE);

    let mut variants = Vec::with_capacity(SizePreset::ALL.len());
    for preset in SizePreset::ALL {
        let (width, height) = preset.dimensions();
        let resized = decoded
            .resize_to_fill(width, height, FilterType::Lanczos3)
            .to_rgb8();

        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, VARIANT_JPEG_QUALITY)
            .encode_image(&resized)
            .map_err(|e| {
                TaskFailure::terminal(format!("Could not encode {preset} variant: {e}"))
            })?;

        variants.push(VariantImage {
            preset,
            width,
            height,
            bytes: buffer.into_inner(),
        });
    }

    Ok(DerivedVariants { variants, palette })
}
