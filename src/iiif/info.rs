//! Capability documents (`info.json`).
//!
//! Builds the Image Information response for a source image, in either the
//! 2.0 or 3.0 serialization. The two versions differ in field names
//! (`@id`/`@type` vs `id`/`type`), in where the size limits live (inside
//! the profile array for 2.0, top level for 3.0), and in feature naming
//! (`sizeAboveFull` vs `sizeUpscaling`).
//!
//! Scale factors are advertised as powers of two, stopping once the
//! longest image edge at that factor would drop below one tile.

use serde::Serialize;

// =============================================================================
// API Version
// =============================================================================

/// The Image API version requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V2,
    V3,
}

impl ApiVersion {
    /// Map the version path segment (`/iiif/{version}/...`) to a version.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "2" => Some(ApiVersion::V2),
            "3" => Some(ApiVersion::V3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V2 => "2",
            ApiVersion::V3 => "3",
        }
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Server-level capabilities advertised in every info document.
///
/// The limits are the same ones the transformation pipeline enforces, so a
/// client honoring the document never hits `SizeExceedsLimits`.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Advertised tile edge (also the scale-factor cutoff)
    pub tile_size: u32,

    /// Maximum output width in pixels
    pub max_width: u32,

    /// Maximum output height in pixels
    pub max_height: u32,

    /// Maximum output area in pixels
    pub max_area: u64,
}

/// Compute the advertised scale factors: powers of two for as long as the
/// longest edge divided by the factor still spans at least one tile.
pub fn scale_factors(width: u32, height: u32, tile_size: u32) -> Vec<u32> {
    let max_dim = width.max(height);
    let mut factors = vec![1u32];
    let mut factor = 1u32;
    while let Some(next) = factor.checked_mul(2) {
        if max_dim / next < tile_size {
            break;
        }
        factors.push(next);
        factor = next;
    }
    factors
}

// =============================================================================
// Serialization shapes
// =============================================================================

/// One advertised size, smallest first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SizeEntry {
    pub width: u32,
    pub height: u32,
}

/// A tile grid description shared by both versions.
#[derive(Debug, Clone, Serialize)]
pub struct TileSet {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

/// Image Information response, 3.0 shape.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfoV3 {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub protocol: &'static str,
    pub profile: &'static str,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "maxWidth")]
    pub max_width: u32,
    #[serde(rename = "maxHeight")]
    pub max_height: u32,
    #[serde(rename = "maxArea")]
    pub max_area: u64,
    pub sizes: Vec<SizeEntry>,
    pub tiles: Vec<TileSet>,
    #[serde(rename = "preferredFormats")]
    pub preferred_formats: Vec<&'static str>,
    #[serde(rename = "extraFormats")]
    pub extra_formats: Vec<&'static str>,
    #[serde(rename = "extraQualities")]
    pub extra_qualities: Vec<&'static str>,
    #[serde(rename = "extraFeatures")]
    pub extra_features: Vec<&'static str>,
}

/// The detail object inside the 2.0 profile array.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetailV2 {
    pub formats: Vec<&'static str>,
    pub qualities: Vec<&'static str>,
    pub supports: Vec<&'static str>,
    #[serde(rename = "maxWidth")]
    pub max_width: u32,
    #[serde(rename = "maxHeight")]
    pub max_height: u32,
    #[serde(rename = "maxArea")]
    pub max_area: u64,
}

/// Image Information response, 2.0 shape.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfoV2 {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: String,
    pub protocol: &'static str,
    pub width: u32,
    pub height: u32,
    /// Serialized as `[compliance URI, detail object]`
    pub profile: (&'static str, ProfileDetailV2),
    pub sizes: Vec<SizeEntry>,
    pub tiles: Vec<TileSet>,
}

/// A version-selected info document ready for JSON serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum InfoDocument {
    V2(ImageInfoV2),
    V3(ImageInfoV3),
}

// =============================================================================
// Builder
// =============================================================================

/// Build the info document for a source image.
///
/// `base_url` is the externally visible server URL (no trailing slash
/// required); the document `id` is `{base_url}/iiif/{version}/{identifier}`
/// with the identifier percent-encoded.
pub fn build_info(
    version: ApiVersion,
    base_url: &str,
    identifier: &str,
    width: u32,
    height: u32,
    caps: &Capabilities,
) -> InfoDocument {
    let base = base_url.trim_end_matches('/');
    let encoded = urlencoding::encode(identifier);
    let id = format!("{}/iiif/{}/{}", base, version.as_str(), encoded);

    let factors = scale_factors(width, height, caps.tile_size);
    let sizes = advertised_sizes(width, height, &factors);
    let tiles = vec![TileSet {
        width: caps.tile_size,
        height: caps.tile_size,
        scale_factors: factors,
    }];

    match version {
        ApiVersion::V3 => InfoDocument::V3(ImageInfoV3 {
            context: "http://iiif.io/api/image/3/context.json",
            id,
            kind: "ImageService3",
            protocol: "http://iiif.io/api/image",
            profile: "level2",
            width,
            height,
            max_width: caps.max_width,
            max_height: caps.max_height,
            max_area: caps.max_area,
            sizes,
            tiles,
            preferred_formats: vec!["jpg", "png", "webp"],
            extra_formats: vec!["tif"],
            extra_qualities: vec!["color", "gray", "bitonal"],
            extra_features: vec![
                "arbitraryRotation",
                "mirroring",
                "regionSquare",
                "sizeUpscaling",
                "cors",
            ],
        }),
        ApiVersion::V2 => InfoDocument::V2(ImageInfoV2 {
            context: "http://iiif.io/api/image/2/context.json",
            id,
            protocol: "http://iiif.io/api/image",
            width,
            height,
            profile: (
                "http://iiif.io/api/image/2/level2.json",
                ProfileDetailV2 {
                    formats: vec!["jpg", "png", "webp", "tif"],
                    qualities: vec!["default", "color", "gray", "bitonal"],
                    supports: vec![
                        "arbitraryRotation",
                        "mirroring",
                        "regionSquare",
                        "sizeAboveFull",
                        "cors",
                    ],
                    max_width: caps.max_width,
                    max_height: caps.max_height,
                    max_area: caps.max_area,
                },
            ),
            sizes,
            tiles,
        }),
    }
}

/// Per-scale-factor full-image sizes, smallest first.
fn advertised_sizes(width: u32, height: u32, factors: &[u32]) -> Vec<SizeEntry> {
    factors
        .iter()
        .rev()
        .map(|&f| SizeEntry {
            width: width.div_ceil(f),
            height: height.div_ceil(f),
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
