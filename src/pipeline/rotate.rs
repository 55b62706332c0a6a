//! Rotation stage: mirror, then rotate clockwise about the image center.
//!
//! Multiples of 90 degrees use the lossless buffer rotations. Any other
//! angle expands the canvas to hold the rotated content and resamples
//! through the inverse affine map with bilinear interpolation; pixels
//! that fall outside the source are filled with the background color.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::iiif::Rotation;

use super::geometry::round_half_away;

/// Apply the rotation stage. The mirror flag flips horizontally *before*
/// the rotation is applied.
pub fn apply_rotation(image: DynamicImage, rotation: &Rotation, background: Rgba<u8>) -> DynamicImage {
    let image = if rotation.mirror { image.fliph() } else { image };

    if rotation.degrees == 0.0 {
        return image;
    }
    if rotation.degrees == 90.0 {
        return image.rotate90();
    }
    if rotation.degrees == 180.0 {
        return image.rotate180();
    }
    if rotation.degrees == 270.0 {
        return image.rotate270();
    }

    DynamicImage::ImageRgba8(rotate_arbitrary(&image.to_rgba8(), rotation.degrees, background))
}

/// Rotate clockwise by an arbitrary angle, expanding the canvas to fit.
fn rotate_arbitrary(source: &RgbaImage, degrees: f64, background: Rgba<u8>) -> RgbaImage {
    let theta = degrees.to_radians();
    let (cos, sin) = (theta.cos(), theta.sin());

    let (src_w, src_h) = (source.width() as f64, source.height() as f64);
    let out_w = round_half_away(src_h * sin.abs() + src_w * cos.abs()).max(1) as u32;
    let out_h = round_half_away(src_h * cos.abs() + src_w * sin.abs()).max(1) as u32;

    // Pixel-center coordinates of the two canvases
    let (src_cx, src_cy) = ((src_w - 1.0) / 2.0, (src_h - 1.0) / 2.0);
    let (out_cx, out_cy) = ((out_w as f64 - 1.0) / 2.0, (out_h as f64 - 1.0) / 2.0);

    let mut output = RgbaImage::from_pixel(out_w, out_h, background);

    for (dx, dy, pixel) in output.enumerate_pixels_mut() {
        let ox = dx as f64 - out_cx;
        let oy = dy as f64 - out_cy;

        // Inverse of a clockwise rotation in y-down image coordinates
        let sx = cos * ox + sin * oy + src_cx;
        let sy = -sin * ox + cos * oy + src_cy;

        if let Some(sample) = bilinear_sample(source, sx, sy) {
            *pixel = sample;
        }
    }

    output
}

/// Sample the source at a fractional coordinate with bilinear weighting.
/// Returns `None` when the coordinate lies outside the source extent.
fn bilinear_sample(source: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let (w, h) = (source.width() as i64, source.height() as i64);
    if x < -0.5 || y < -0.5 || x > w as f64 - 0.5 || y > h as f64 - 0.5 {
        return None;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let clamp = |v: i64, max: i64| v.clamp(0, max - 1) as u32;
    let p00 = source.get_pixel(clamp(x0, w), clamp(y0, h));
    let p10 = source.get_pixel(clamp(x0 + 1, w), clamp(y0, h));
    let p01 = source.get_pixel(clamp(x0, w), clamp(y0 + 1, h));
    let p11 = source.get_pixel(clamp(x0 + 1, w), clamp(y0 + 1, h));

    let mut out = [0u8; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let top = p00.0[i] as f64 * (1.0 - fx) + p10.0[i] as f64 * fx;
        let bottom = p01.0[i] as f64 * (1.0 - fx) + p11.0[i] as f64 * fx;
        *channel = round_half_away(top * (1.0 - fy) + bottom * fy).clamp(0, 255) as u8;
    }

    Some(Rgba(out))
}

// =============================================================================
// Tests
// =============================================================================
