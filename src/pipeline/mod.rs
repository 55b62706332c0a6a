//! Transformation pipeline.
//!
//! Applies a parsed request to a decoded pixel buffer in the fixed stage
//! order the Image API requires:
//!
//! 1. Region extraction against the source dimensions
//! 2. Size resolution against the *post-region* dimensions
//! 3. Rotation (mirror first, then rotate about the center)
//! 4. Quality (color treatment) conversion
//!
//! The order is load-bearing: each stage's geometry is defined relative to
//! the previous stage's output. Every stage produces a fresh buffer; the
//! shared decoded source is never mutated.

mod geometry;
mod rotate;

use image::imageops::FilterType;
use image::{DynamicImage, Rgba};

use crate::error::TransformError;
use crate::iiif::{ImageRequest, Quality};

pub use geometry::{resolve_region, resolve_size, round_half_away, Rect, SizeLimits};
pub use rotate::apply_rotation;

/// Fixed luminance threshold for bitonal output: values above it become
/// white, the rest black.
pub const BITONAL_THRESHOLD: u8 = 128;

/// Parameters the pipeline needs beyond the request itself.
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    /// Output size limits enforced during size resolution
    pub limits: SizeLimits,

    /// Background fill for rotations that expand the canvas
    pub background: Rgba<u8>,
}

/// Apply the full pipeline to a decoded source buffer.
///
/// Returns the transformed buffer ready for encoding, or the first error
/// encountered; no partial result is ever produced.
pub fn transform(
    source: &DynamicImage,
    request: &ImageRequest,
    opts: &TransformOptions,
) -> Result<DynamicImage, TransformError> {
    // 1. Region
    let rect = resolve_region(&request.region, source.width(), source.height())?;
    let cropped = source.crop_imm(rect.x, rect.y, rect.width, rect.height);

    // 2. Size
    let (width, height) = resolve_size(&request.size, rect.width, rect.height, &opts.limits)?;
    let scaled = if (width, height) == (rect.width, rect.height) {
        cropped
    } else {
        cropped.resize_exact(width, height, FilterType::Lanczos3)
    };

    // 3. Rotation
    let rotated = apply_rotation(scaled, &request.rotation, opts.background);

    // 4. Quality
    let finished = match request.quality {
        Quality::Color => rotated,
        Quality::Default => rotated,
        Quality::Gray => DynamicImage::ImageLuma8(rotated.to_luma8()),
        Quality::Bitonal => {
            let mut luma = rotated.to_luma8();
            for pixel in luma.pixels_mut() {
                pixel.0[0] = if pixel.0[0] > BITONAL_THRESHOLD { 255 } else { 0 };
            }
            DynamicImage::ImageLuma8(luma)
        }
    };

    Ok(finished)
}

// =============================================================================
// Tests
// =============================================================================
