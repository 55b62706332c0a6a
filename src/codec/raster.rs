//! Codecs for the common raster formats, backed by the `image` crate.
//!
//! Each codec sniffs its own magic bytes and decodes with an explicit
//! format hint so a mislabeled payload fails as a decode error rather
//! than being silently re-detected as something else.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::CodecError;

use super::{EncodeOptions, ImageCodec, PngCompression};

fn decode_with_format(
    bytes: &[u8],
    format: ImageFormat,
    id: &'static str,
) -> Result<DynamicImage, CodecError> {
    ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| CodecError::Decode { format: id, message: e.to_string() })
}

fn probe_with_format(
    bytes: &[u8],
    format: ImageFormat,
    id: &'static str,
) -> Result<(u32, u32), CodecError> {
    ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| CodecError::Decode { format: id, message: e.to_string() })
}

// =============================================================================
// JPEG
// =============================================================================

/// JPEG codec. Flattens alpha onto the pipeline's already-composited
/// buffer, since the encoding has no alpha channel.
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn id(&self) -> &'static str {
        "jpg"
    }

    fn media_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&[0xFF, 0xD8, 0xFF])
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        decode_with_format(bytes, ImageFormat::Jpeg, self.id())
    }

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        probe_with_format(bytes, ImageFormat::Jpeg, self.id())
    }

    fn encode(&self, image: &DynamicImage, opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        let quality = opts.jpeg_quality.clamp(1, 100);

        // JPEG is 8-bit and has no alpha: narrow everything else,
        // preserving single-channel buffers as grayscale
        let narrowed;
        let image = match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => {
                narrowed = DynamicImage::ImageLuma8(image.to_luma8());
                &narrowed
            }
            _ => {
                narrowed = DynamicImage::ImageRgb8(image.to_rgb8());
                &narrowed
            }
        };

        let mut output = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut output, quality);
        image
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode { format: self.id(), message: e.to_string() })?;
        Ok(output)
    }
}

// =============================================================================
// PNG
// =============================================================================

pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn id(&self) -> &'static str {
        "png"
    }

    fn media_type(&self) -> &'static str {
        "image/png"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        decode_with_format(bytes, ImageFormat::Png, self.id())
    }

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        probe_with_format(bytes, ImageFormat::Png, self.id())
    }

    fn encode(&self, image: &DynamicImage, opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        let compression = match opts.png_compression {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        };

        let mut output = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut output, compression, PngFilterType::Adaptive);
        image
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode { format: self.id(), message: e.to_string() })?;
        Ok(output)
    }
}

// =============================================================================
// WebP
// =============================================================================

/// WebP codec. The `image` crate encodes lossless WebP only, which also
/// keeps the output deterministic.
pub struct WebpCodec;

impl ImageCodec for WebpCodec {
    fn id(&self) -> &'static str {
        "webp"
    }

    fn media_type(&self) -> &'static str {
        "image/webp"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        decode_with_format(bytes, ImageFormat::WebP, self.id())
    }

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        probe_with_format(bytes, ImageFormat::WebP, self.id())
    }

    fn encode(&self, image: &DynamicImage, _opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        // The encoder accepts RGB8/RGBA8 only; widen other buffers
        let widened;
        let image = match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
            _ if image.color().has_alpha() => {
                widened = DynamicImage::ImageRgba8(image.to_rgba8());
                &widened
            }
            _ => {
                widened = DynamicImage::ImageRgb8(image.to_rgb8());
                &widened
            }
        };

        let mut output = Vec::new();
        let encoder = WebPEncoder::new_lossless(&mut output);
        image
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode { format: self.id(), message: e.to_string() })?;
        Ok(output)
    }
}

// =============================================================================
// TIFF
// =============================================================================

pub struct TiffCodec;

impl ImageCodec for TiffCodec {
    fn id(&self) -> &'static str {
        "tif"
    }

    fn media_type(&self) -> &'static str {
        "image/tiff"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        decode_with_format(bytes, ImageFormat::Tiff, self.id())
    }

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        probe_with_format(bytes, ImageFormat::Tiff, self.id())
    }

    fn encode(&self, image: &DynamicImage, _opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        let mut cursor = Cursor::new(Vec::new());
        let encoder = TiffEncoder::new(&mut cursor);
        image
            .write_with_encoder(encoder)
            .map_err(|e| CodecError::Encode { format: self.id(), message: e.to_string() })?;
        Ok(cursor.into_inner())
    }
}

// =============================================================================
// Tests
// =============================================================================
