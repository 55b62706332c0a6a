//! # IIIF Streamer
//!
//! An IIIF Image API (2.0/3.0) server for local image stores.
//!
//! This library implements the image-delivery engine behind the IIIF
//! Image API: parsing the structured request path (region, size,
//! rotation, quality, format), transforming source images with the exact
//! ordering and numeric semantics the API specifies, negotiating output
//! formats through a per-format codec registry, and producing the
//! `info.json` capability documents third-party viewers interoperate
//! against.
//!
//! ## Features
//!
//! - **Strict request grammar**: the four IIIF path segments are parsed
//!   into typed descriptors before any I/O; malformed requests never touch
//!   pixels
//! - **Faithful pipeline semantics**: region, then size, then rotation,
//!   then quality, in fixed order; round-half-away-from-zero everywhere;
//!   upscaling gated on the `^` prefix
//! - **Format support**: JPEG, PNG, WebP and TIFF in and out; JPEG 2000
//!   sources
//! - **Two-level caching**: decoded sources and rendered outputs, each
//!   with singleflight coalescing of concurrent identical work
//! - **Dual protocol versions**: 2.0 and 3.0 `info.json` serializations
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`iiif`] - Request model, grammar parser, and capability documents
//! - [`pipeline`] - Geometry resolution and the transformation stages
//! - [`codec`] - Per-format decode/encode behind a registry
//! - [`store`] - Image source abstraction and the filesystem store
//! - [`service`] - Orchestration, caching, and concurrency control
//! - [`server`] - Axum-based HTTP routes and handlers
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use iiif_streamer::codec::CodecRegistry;
//! use iiif_streamer::iiif::Capabilities;
//! use iiif_streamer::server::{create_router, AppState, RouterConfig};
//! use iiif_streamer::service::ImageService;
//! use iiif_streamer::store::FsImageSource;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = FsImageSource::new("/var/images");
//!     let service = ImageService::new(source, CodecRegistry::with_default_codecs());
//!     let caps = Capabilities {
//!         tile_size: 256,
//!         max_width: 10_000,
//!         max_height: 10_000,
//!         max_area: 100_000_000,
//!     };
//!
//!     let state = AppState::new(service, caps, "http://localhost:3000");
//!     let router = create_router(state, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod iiif;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use codec::{CodecRegistry, EncodeOptions, EncodedImage, ImageCodec, PngCompression};
pub use config::Config;
pub use error::{CodecError, ImageServiceError, ParseError, StoreError, TransformError};
pub use iiif::{
    build_info, parse_image_request, ApiVersion, Capabilities, Format, ImageRequest, InfoDocument,
    Quality, Region, Rotation, Size, SizeMode,
};
pub use pipeline::{transform, SizeLimits, TransformOptions};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use service::{ImageService, RenderedImage, ServiceConfig, ServiceStats};
pub use store::{FsImageSource, ImageSource};
