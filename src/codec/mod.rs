//! Format codec layer.
//!
//! Every supported image format implements the [`ImageCodec`] capability
//! set (`sniff` / `decode` / `probe` / `encode`) and is registered in a
//! [`CodecRegistry`] under its format identifier. The transformation
//! pipeline and the service never branch on format names: adding a format
//! means implementing the trait and registering it, nothing else.
//!
//! Decoding selects a codec by sniffing the source's magic bytes, so the
//! set of *source* formats (which includes JPEG 2000) is independent of
//! the set of *output* formats advertised in `info.json`.
//!
//! Encoding is deterministic for an identical buffer and options; the
//! service relies on this for cache-key validity and the tests rely on it
//! for reproducibility.

mod jp2;
mod raster;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;

use crate::error::CodecError;
use crate::iiif::Format;

pub use jp2::Jp2Codec;
pub use raster::{JpegCodec, PngCodec, TiffCodec, WebpCodec};

// =============================================================================
// Encode options
// =============================================================================

/// PNG compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

/// Per-format encoding parameters.
///
/// Formats ignore the parameters they do not use (WebP output is lossless,
/// TIFF is uncompressed).
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,

    /// PNG compression effort
    pub png_compression: PngCompression,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            png_compression: PngCompression::Default,
        }
    }
}

// =============================================================================
// Codec trait
// =============================================================================

/// The capability set a format implementation provides.
pub trait ImageCodec: Send + Sync {
    /// Format identifier, matching the request extension where the format
    /// is an output format (`"jpg"`, `"png"`, ...).
    fn id(&self) -> &'static str;

    /// MIME type of the encoded form.
    fn media_type(&self) -> &'static str;

    /// Whether `bytes` begin with this format's signature.
    fn sniff(&self, bytes: &[u8]) -> bool;

    /// Decode the full pixel buffer.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Read dimensions without a full decode where the format allows it.
    ///
    /// The default falls back to a full decode; codecs with cheap header
    /// parsing override this.
    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        self.decode(bytes).map(|img| (img.width(), img.height()))
    }

    /// Encode a pixel buffer. Decode-only codecs return
    /// [`CodecError::EncodeUnsupported`].
    fn encode(&self, image: &DynamicImage, opts: &EncodeOptions) -> Result<Vec<u8>, CodecError>;
}

// =============================================================================
// Encoded output
// =============================================================================

/// An encoded image plus its MIME type.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub media_type: &'static str,
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of codecs, indexed by format identifier for encoding and
/// sniffed in registration order for decoding.
///
/// Tracks how many actual decodes it has executed so callers (and the
/// singleflight tests) can verify that caching collapses duplicate work.
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn ImageCodec>>,
    by_id: HashMap<&'static str, usize>,
    decode_executions: AtomicU64,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            codecs: Vec::new(),
            by_id: HashMap::new(),
            decode_executions: AtomicU64::new(0),
        }
    }

    /// Create a registry with every built-in codec registered.
    pub fn with_default_codecs() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JpegCodec));
        registry.register(Arc::new(PngCodec));
        registry.register(Arc::new(WebpCodec));
        registry.register(Arc::new(TiffCodec));
        registry.register(Arc::new(Jp2Codec));
        registry
    }

    /// Register a codec. A codec registered later under an existing id
    /// replaces the earlier one for encoding; both still participate in
    /// decode sniffing.
    pub fn register(&mut self, codec: Arc<dyn ImageCodec>) {
        let index = self.codecs.len();
        self.by_id.insert(codec.id(), index);
        self.codecs.push(codec);
    }

    /// Decode source bytes by sniffing for a matching codec.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        let codec = self
            .sniff(bytes)
            .ok_or(CodecError::UnknownSourceFormat)?;
        self.decode_executions.fetch_add(1, Ordering::SeqCst);
        codec.decode(bytes)
    }

    /// Probe source dimensions without a full decode where possible.
    pub fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), CodecError> {
        let codec = self
            .sniff(bytes)
            .ok_or(CodecError::UnknownSourceFormat)?;
        codec.probe(bytes)
    }

    /// Encode a buffer to the requested output format.
    pub fn encode(
        &self,
        format: Format,
        image: &DynamicImage,
        opts: &EncodeOptions,
    ) -> Result<EncodedImage, CodecError> {
        let codec = self
            .by_id
            .get(format.extension())
            .map(|&i| &self.codecs[i])
            .ok_or(CodecError::EncodeUnsupported(format.extension()))?;
        let bytes = codec.encode(image, opts)?;
        Ok(EncodedImage {
            bytes: Bytes::from(bytes),
            media_type: codec.media_type(),
        })
    }

    /// Number of full decodes this registry has executed.
    pub fn decode_executions(&self) -> u64 {
        self.decode_executions.load(Ordering::SeqCst)
    }

    fn sniff(&self, bytes: &[u8]) -> Option<&Arc<dyn ImageCodec>> {
        self.codecs.iter().find(|codec| codec.sniff(bytes))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_default_codecs()
    }
}

// =============================================================================
// Tests
// =============================================================================
