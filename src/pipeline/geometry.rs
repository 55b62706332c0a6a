//! Geometric resolution of region and size specifications.
//!
//! All conversions from fractional values to pixels use
//! round-half-away-from-zero. The Image API leaves the rounding rule to
//! implementations and they disagree in practice; this one is fixed here
//! as the canonical behavior so outputs are reproducible.

use crate::error::TransformError;
use crate::iiif::{Region, Size, SizeMode};

/// A resolved pixel rectangle within a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Server-configured output size limits.
#[derive(Debug, Clone, Copy)]
pub struct SizeLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_area: u64,
}

/// Round half away from zero.
pub fn round_half_away(value: f64) -> i64 {
    if value >= 0.0 {
        (value + 0.5).floor() as i64
    } else {
        (value - 0.5).ceil() as i64
    }
}

// =============================================================================
// Region resolution
// =============================================================================

/// Resolve a region against the source dimensions.
///
/// Pixel and percent rectangles are clamped to the image bounds rather
/// than rejected; only a rectangle that clamps to nothing (zero width or
/// height, or an origin past the far edge) is an error.
pub fn resolve_region(
    region: &Region,
    source_width: u32,
    source_height: u32,
) -> Result<Rect, TransformError> {
    match *region {
        Region::Full => Ok(Rect { x: 0, y: 0, width: source_width, height: source_height }),

        Region::Square => {
            let side = source_width.min(source_height);
            Ok(Rect {
                x: (source_width - side) / 2,
                y: (source_height - side) / 2,
                width: side,
                height: side,
            })
        }

        Region::Pixels { x, y, width, height } => {
            clamp_rect(x, y, width, height, source_width, source_height)
        }

        Region::Pct { x, y, width, height } => {
            let to_px = |pct: f64, dim: u32| round_half_away(dim as f64 * pct / 100.0).max(0) as u32;
            clamp_rect(
                to_px(x, source_width),
                to_px(y, source_height),
                to_px(width, source_width),
                to_px(height, source_height),
                source_width,
                source_height,
            )
        }
    }
}

fn clamp_rect(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    source_width: u32,
    source_height: u32,
) -> Result<Rect, TransformError> {
    let cx = x.min(source_width);
    let cy = y.min(source_height);
    let cw = width.min(source_width - cx);
    let ch = height.min(source_height - cy);

    if cw == 0 || ch == 0 {
        return Err(TransformError::OutOfBounds {
            x,
            y,
            width,
            height,
            source_width,
            source_height,
        });
    }

    Ok(Rect { x: cx, y: cy, width: cw, height: ch })
}

// =============================================================================
// Size resolution
// =============================================================================

/// Resolve a size against the post-region dimensions.
///
/// Upscaling (either output dimension exceeding its region dimension) is
/// rejected unless the request carried the `^` prefix; it is never
/// silently clamped. Explicit sizes beyond the server limits are rejected;
/// `max` sizes are computed to fit the limits.
pub fn resolve_size(
    size: &Size,
    region_width: u32,
    region_height: u32,
    limits: &SizeLimits,
) -> Result<(u32, u32), TransformError> {
    let rw = region_width as f64;
    let rh = region_height as f64;

    let (width, height) = match size.mode {
        SizeMode::Max => {
            // Largest scale at which width, height, and area all fit the
            // limits; floor keeps the result strictly within them
            let fit = limit_fit_scale(rw, rh, limits);
            let scale = if size.upscale { fit } else { fit.min(1.0) };
            (
                ((rw * scale).floor() as u32).max(1),
                ((rh * scale).floor() as u32).max(1),
            )
        }

        SizeMode::Width(w) => {
            if w == 0 {
                return Err(TransformError::EmptySize { width: 0, height: 0 });
            }
            let h = round_half_away(rh * w as f64 / rw).max(1) as u32;
            (w, h)
        }

        SizeMode::Height(h) => {
            if h == 0 {
                return Err(TransformError::EmptySize { width: 0, height: 0 });
            }
            let w = round_half_away(rw * h as f64 / rh).max(1) as u32;
            (w, h)
        }

        SizeMode::Exact(w, h) => {
            if w == 0 || h == 0 {
                return Err(TransformError::EmptySize { width: w, height: h });
            }
            (w, h)
        }

        SizeMode::BestFit(w, h) => {
            if w == 0 || h == 0 {
                return Err(TransformError::EmptySize { width: w, height: h });
            }
            let scale = (w as f64 / rw).min(h as f64 / rh);
            (
                (round_half_away(rw * scale).max(1)) as u32,
                (round_half_away(rh * scale).max(1)) as u32,
            )
        }

        SizeMode::Pct(n) => (
            (round_half_away(rw * n / 100.0).max(1)) as u32,
            (round_half_away(rh * n / 100.0).max(1)) as u32,
        ),
    };

    if !size.upscale && (width > region_width || height > region_height) {
        return Err(TransformError::UpscalingDenied {
            requested_width: width,
            requested_height: height,
            available_width: region_width,
            available_height: region_height,
        });
    }

    if width > limits.max_width
        || height > limits.max_height
        || width as u64 * height as u64 > limits.max_area
    {
        return Err(TransformError::SizeExceedsLimits {
            width,
            height,
            max_width: limits.max_width,
            max_height: limits.max_height,
            max_area: limits.max_area,
        });
    }

    Ok((width, height))
}

fn limit_fit_scale(region_width: f64, region_height: f64, limits: &SizeLimits) -> f64 {
    let by_width = limits.max_width as f64 / region_width;
    let by_height = limits.max_height as f64 / region_height;
    let by_area = (limits.max_area as f64 / (region_width * region_height)).sqrt();
    by_width.min(by_height).min(by_area)
}

// =============================================================================
// Tests
// =============================================================================
