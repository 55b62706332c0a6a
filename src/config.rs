//! Configuration management.
//!
//! All options come from command-line arguments with `IIIF_`-prefixed
//! environment variable fallbacks and sensible defaults.
//!
//! # Environment Variables
//!
//! - `IIIF_HOST` - Server bind address (default: 0.0.0.0)
//! - `IIIF_PORT` - Server port (default: 3000)
//! - `IIIF_IMAGE_DIR` - Directory containing source images (required)
//! - `IIIF_BASE_URL` - Externally visible base URL (default: http://localhost:3000)
//! - `IIIF_TILE_SIZE` - Advertised tile edge in pixels (default: 256)
//! - `IIIF_MAX_WIDTH` / `IIIF_MAX_HEIGHT` - Output dimension limits (default: 10000)
//! - `IIIF_MAX_AREA` - Output area limit in pixels (default: 100000000)
//! - `IIIF_JPEG_QUALITY` - JPEG encode quality (default: 90)
//! - `IIIF_PNG_COMPRESSION` - PNG compression level 0-9 (default: 6)
//! - `IIIF_CACHE_SOURCES` - Decoded sources to cache (default: 32)
//! - `IIIF_CACHE_OUTPUTS` - Rendered output cache in bytes (default: 100MB)
//! - `IIIF_MAX_CONCURRENT` - In-flight transformation bound (default: 16)
//! - `IIIF_BACKGROUND` - Rotation background color, #RRGGBB or #RRGGBBAA
//! - `IIIF_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `IIIF_CORS_ORIGINS` - Allowed CORS origins, comma separated

use std::path::PathBuf;

use clap::Parser;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default public base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default advertised tile edge.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default output dimension limit.
pub const DEFAULT_MAX_DIMENSION: u32 = 10_000;

/// Default output area limit.
pub const DEFAULT_MAX_AREA: u64 = 100_000_000;

/// Default JPEG encode quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default PNG compression level.
pub const DEFAULT_PNG_COMPRESSION: u8 = 6;

/// Default number of decoded sources to cache.
pub const DEFAULT_SOURCE_CACHE_ENTRIES: usize = 32;

/// Default rendered output cache budget (100MB).
pub const DEFAULT_OUTPUT_CACHE_BYTES: usize = 100 * 1024 * 1024;

/// Default bound on concurrently executing transformations.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// IIIF Streamer - an IIIF Image API server for local image stores.
///
/// Serves IIIF Image API 2.0/3.0 requests (region, size, rotation,
/// quality, format) and info.json capability documents for images in a
/// local directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "iiif-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IIIF_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IIIF_PORT")]
    pub port: u16,

    /// Externally visible base URL, used in info.json ids and Link headers.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "IIIF_BASE_URL")]
    pub base_url: String,

    // =========================================================================
    // Image Store Configuration
    // =========================================================================
    /// Directory containing the source images.
    #[arg(long, env = "IIIF_IMAGE_DIR")]
    pub image_dir: PathBuf,

    // =========================================================================
    // Capability Configuration
    // =========================================================================
    /// Tile edge advertised in info.json (also the scale-factor cutoff).
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "IIIF_TILE_SIZE")]
    pub tile_size: u32,

    /// Maximum output width in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "IIIF_MAX_WIDTH")]
    pub max_width: u32,

    /// Maximum output height in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "IIIF_MAX_HEIGHT")]
    pub max_height: u32,

    /// Maximum output area in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_AREA, env = "IIIF_MAX_AREA")]
    pub max_area: u64,

    // =========================================================================
    // Encoding Configuration
    // =========================================================================
    /// JPEG encode quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "IIIF_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// PNG compression level (0-9; 0-3 fast, 4-6 default, 7-9 best).
    #[arg(long, default_value_t = DEFAULT_PNG_COMPRESSION, env = "IIIF_PNG_COMPRESSION")]
    pub png_compression: u8,

    /// Background color for expanded rotation canvases (#RRGGBB or
    /// #RRGGBBAA). Defaults to transparent for alpha-capable formats and
    /// white for JPEG.
    #[arg(long, env = "IIIF_BACKGROUND")]
    pub background: Option<String>,

    // =========================================================================
    // Cache and Concurrency Configuration
    // =========================================================================
    /// Maximum number of decoded source images to keep in memory.
    #[arg(long, default_value_t = DEFAULT_SOURCE_CACHE_ENTRIES, env = "IIIF_CACHE_SOURCES")]
    pub cache_sources: usize,

    /// Rendered output cache budget in bytes.
    #[arg(long, default_value_t = DEFAULT_OUTPUT_CACHE_BYTES, env = "IIIF_CACHE_OUTPUTS")]
    pub cache_outputs: usize,

    /// Maximum number of concurrently executing transformations.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT, env = "IIIF_MAX_CONCURRENT")]
    pub max_concurrent: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "IIIF_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated). If not specified, allows
    /// any origin.
    #[arg(long, env = "IIIF_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.image_dir.as_os_str().is_empty() {
            return Err("image_dir is required. Set --image-dir or IIIF_IMAGE_DIR".to_string());
        }

        if let Err(e) = url::Url::parse(&self.base_url) {
            return Err(format!("base_url is not a valid URL: {}", e));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }
        if self.png_compression > 9 {
            return Err("png_compression must be between 0 and 9".to_string());
        }

        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.max_width == 0 || self.max_height == 0 || self.max_area == 0 {
            return Err("max_width, max_height and max_area must be greater than 0".to_string());
        }

        if self.cache_sources == 0 {
            return Err("cache_sources must be greater than 0".to_string());
        }
        if self.cache_outputs == 0 {
            return Err("cache_outputs must be greater than 0".to_string());
        }
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".to_string());
        }

        if self.background.is_some() {
            self.parse_background()?;
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the configured background color, if any.
    pub fn parse_background(&self) -> Result<Option<[u8; 4]>, String> {
        let Some(ref spec) = self.background else {
            return Ok(None);
        };

        let hex = spec.strip_prefix('#').unwrap_or(spec);
        if !hex.is_ascii() {
            return Err(format!("background is not a valid hex color: {:?}", spec));
        }
        let parse_channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| format!("background is not a valid hex color: {:?}", spec))
        };

        match hex.len() {
            6 => Ok(Some([
                parse_channel(0..2)?,
                parse_channel(2..4)?,
                parse_channel(4..6)?,
                255,
            ])),
            8 => Ok(Some([
                parse_channel(0..2)?,
                parse_channel(2..4)?,
                parse_channel(4..6)?,
                parse_channel(6..8)?,
            ])),
            _ => Err(format!(
                "background must be #RRGGBB or #RRGGBBAA, got {:?}",
                spec
            )),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
