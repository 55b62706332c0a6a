//! Typed IIIF request descriptors.
//!
//! A parsed request is a set of tagged variants, one per path segment. The
//! transformation pipeline matches exhaustively over these; there is no
//! stringly-typed fallback path.
//!
//! The descriptors also render their *canonical* textual form, which is
//! used as the transformed-output cache key: equivalent spellings that the
//! Image API defines as the same request (`pct:0,0,100,100` vs `full`,
//! `pct:100` vs `max`, `90.0` vs `90`) fold to one key.

use crate::error::ParseError;

// =============================================================================
// Region
// =============================================================================

/// The sub-rectangle of the source image selected before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// The complete image
    Full,

    /// A centered square of side `min(width, height)`
    Square,

    /// Absolute pixel rectangle, clamped to the image bounds at resolution time
    Pixels { x: u32, y: u32, width: u32, height: u32 },

    /// Rectangle expressed as percentages of the native dimensions
    Pct { x: f64, y: f64, width: f64, height: f64 },
}

impl Region {
    /// Render the canonical spelling of this region.
    ///
    /// `pct:0,0,100,100` is defined by the Image API to be the full image
    /// and folds to `full`.
    pub fn canonical(&self) -> String {
        match *self {
            Region::Full => "full".to_string(),
            Region::Square => "square".to_string(),
            Region::Pixels { x, y, width, height } => format!("{},{},{},{}", x, y, width, height),
            Region::Pct { x, y, width, height } => {
                if x == 0.0 && y == 0.0 && width == 100.0 && height == 100.0 {
                    "full".to_string()
                } else {
                    format!("pct:{},{},{},{}", x, y, width, height)
                }
            }
        }
    }
}

// =============================================================================
// Size
// =============================================================================

/// How the post-region image is scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeMode {
    /// As large as the region (or the server limits) allow
    Max,

    /// Exact width, height derived from the aspect ratio (`w,`)
    Width(u32),

    /// Exact height, width derived from the aspect ratio (`,h`)
    Height(u32),

    /// Exact width and height, aspect ratio not preserved (`w,h`)
    Exact(u32, u32),

    /// Largest size preserving aspect ratio that fits in `w,h` (`!w,h`)
    BestFit(u32, u32),

    /// Both dimensions scaled by a percentage of the region (`pct:n`)
    Pct(f64),
}

/// A size specification: the mode plus whether the `^` prefix permitted
/// upscaling beyond the post-region dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub mode: SizeMode,
    pub upscale: bool,
}

impl Size {
    pub fn new(mode: SizeMode) -> Self {
        Self { mode, upscale: false }
    }

    pub fn upscaled(mode: SizeMode) -> Self {
        Self { mode, upscale: true }
    }

    /// Render the canonical spelling of this size.
    ///
    /// `pct:100` without `^` is the region at its own scale and folds to
    /// `max` (as does the 2.0 legacy `full`, which the parser already maps
    /// to [`SizeMode::Max`]).
    pub fn canonical(&self) -> String {
        let prefix = if self.upscale { "^" } else { "" };
        let body = match self.mode {
            SizeMode::Max => "max".to_string(),
            SizeMode::Width(w) => format!("{},", w),
            SizeMode::Height(h) => format!(",{}", h),
            SizeMode::Exact(w, h) => format!("{},{}", w, h),
            SizeMode::BestFit(w, h) => format!("!{},{}", w, h),
            SizeMode::Pct(n) => {
                if n == 100.0 && !self.upscale {
                    "max".to_string()
                } else {
                    format!("pct:{}", n)
                }
            }
        };
        format!("{}{}", prefix, body)
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Rotation in degrees with an orthogonal mirror flag.
///
/// The mirror (horizontal flip) is applied *before* the rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Degrees clockwise, in [0, 360)
    pub degrees: f64,

    /// Mirror the image along the vertical axis before rotating
    pub mirror: bool,
}

impl Rotation {
    /// A rotation of zero degrees without mirroring (the identity).
    pub fn none() -> Self {
        Self { degrees: 0.0, mirror: false }
    }

    /// Whether this rotation leaves the image untouched.
    pub fn is_identity(&self) -> bool {
        self.degrees == 0.0 && !self.mirror
    }

    pub fn canonical(&self) -> String {
        let prefix = if self.mirror { "!" } else { "" };
        format!("{}{}", prefix, self.degrees)
    }
}

// =============================================================================
// Quality
// =============================================================================

/// The color treatment of the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Color,
    Gray,
    Bitonal,
    Default,
}

impl Quality {
    pub fn from_literal(s: &str) -> Result<Self, ParseError> {
        match s {
            "color" => Ok(Quality::Color),
            "gray" => Ok(Quality::Gray),
            "bitonal" => Ok(Quality::Bitonal),
            "default" => Ok(Quality::Default),
            other => Err(ParseError::InvalidQuality(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
            Quality::Default => "default",
        }
    }

    /// All quality literals this server accepts.
    pub const ALL: [Quality; 4] = [Quality::Color, Quality::Gray, Quality::Bitonal, Quality::Default];
}

// =============================================================================
// Format
// =============================================================================

/// Supported output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Jpg,
    Png,
    Webp,
    Tif,
}

impl Format {
    /// Map a path extension to a format.
    ///
    /// Returns `None` for unknown extensions so the caller can distinguish
    /// "unsupported format" (415) from plain syntax errors.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(Format::Jpg),
            "png" => Some(Format::Png),
            "webp" => Some(Format::Webp),
            "tif" | "tiff" => Some(Format::Tif),
            _ => None,
        }
    }

    /// The canonical extension (used in cache keys and info.json).
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Tif => "tif",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Format::Jpg => "image/jpeg",
            Format::Png => "image/png",
            Format::Webp => "image/webp",
            Format::Tif => "image/tiff",
        }
    }

    /// Whether the encoding carries an alpha channel.
    ///
    /// Decides the background fill for rotations that expand the canvas:
    /// transparent where supported, else the configured opaque color.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Format::Jpg)
    }

    pub const ALL: [Format; 4] = [Format::Jpg, Format::Png, Format::Webp, Format::Tif];
}

// =============================================================================
// ImageRequest
// =============================================================================

/// A fully parsed and validated IIIF image request.
///
/// Constructed only by [`crate::iiif::parse_image_request`]; immutable
/// afterwards. All geometric resolution against actual pixel dimensions
/// happens later in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub identifier: String,
    pub region: Region,
    pub size: Size,
    pub rotation: Rotation,
    pub quality: Quality,
    pub format: Format,
}

impl ImageRequest {
    /// Render the canonical request path (without the identifier), used as
    /// the transformed-output cache key.
    pub fn canonical(&self) -> String {
        format!(
            "{}/{}/{}/{}.{}",
            self.region.canonical(),
            self.size.canonical(),
            self.rotation.canonical(),
            self.quality.as_str(),
            self.format.extension(),
        )
    }
}
