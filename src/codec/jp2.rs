//! JPEG 2000 source codec.
//!
//! Decode-only: `.jp2` masters are common in digitization workflows, but
//! this server never encodes to JPEG 2000, so `encode` reports the
//! capability as unsupported instead of pretending.

use image::DynamicImage;

use crate::error::CodecError;

use super::{EncodeOptions, ImageCodec};

/// JP2 container signature.
const JP2_MAGIC: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// Raw J2K codestream signature (SOC + SIZ markers).
const J2K_MAGIC: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];

pub struct Jp2Codec;

impl ImageCodec for Jp2Codec {
    fn id(&self) -> &'static str {
        "jp2"
    }

    fn media_type(&self) -> &'static str {
        "image/jp2"
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(&JP2_MAGIC) || bytes.starts_with(&J2K_MAGIC)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        let jp2 = jpeg2k::Image::from_bytes(bytes)
            .map_err(|e| CodecError::Decode { format: self.id(), message: e.to_string() })?;
        DynamicImage::try_from(&jp2)
            .map_err(|e| CodecError::Decode { format: self.id(), message: e.to_string() })
    }

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        // openjpeg exposes dimensions after the (cheap) header parse that
        // from_bytes performs, without requiring pixel conversion
        let jp2 = jpeg2k::Image::from_bytes(bytes)
            .map_err(|e| CodecError::Decode { format: self.id(), message: e.to_string() })?;
        Ok((jp2.width(), jp2.height()))
    }

    fn encode(&self, _image: &DynamicImage, _opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
        Err(CodecError::EncodeUnsupported(self.id()))
    }
}
