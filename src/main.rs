//! IIIF Streamer - an IIIF Image API server for local image stores.
//!
//! This binary parses configuration, wires up the image service, and
//! starts the HTTP server.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iiif_streamer::{
    codec::{CodecRegistry, EncodeOptions, PngCompression},
    config::Config,
    iiif::Capabilities,
    pipeline::SizeLimits,
    server::{create_router, AppState, RouterConfig},
    service::{ImageService, ServiceConfig},
    store::FsImageSource,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // Verify the image directory before serving anything
    match tokio::fs::metadata(&config.image_dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            error!("Image path is not a directory: {}", config.image_dir.display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(
                "Cannot access image directory {}: {}",
                config.image_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    info!("Configuration:");
    info!("  Image directory: {}", config.image_dir.display());
    info!("  Base URL: {}", config.base_url);
    info!(
        "  Limits: {}x{} max, {} px area, tile size {}",
        config.max_width, config.max_height, config.max_area, config.tile_size
    );
    info!(
        "  Cache: {} sources, {}MB outputs, {} concurrent transforms",
        config.cache_sources,
        config.cache_outputs / (1024 * 1024),
        config.max_concurrent
    );

    // Build the service
    let service_config = build_service_config(&config);
    let source = FsImageSource::new(&config.image_dir);
    let service = ImageService::with_config(source, CodecRegistry::with_default_codecs(), service_config);

    let caps = Capabilities {
        tile_size: config.tile_size,
        max_width: config.max_width,
        max_height: config.max_height,
        max_area: config.max_area,
    };

    let state = AppState::new(service, caps, config.base_url.clone())
        .with_cache_max_age(config.cache_max_age);

    // Build the router
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }
    let router = create_router(state, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("Server listening on: http://{}", addr);
    info!("");
    info!("Try these endpoints:");
    info!("  curl http://{}/health", addr);
    info!("  curl http://{}/iiif/3/<identifier>/info.json", addr);
    info!("  curl http://{}/iiif/3/<identifier>/full/max/0/default.jpg", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iiif_streamer=debug,tower_http=debug"
    } else {
        "iiif_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the ServiceConfig from the application Config.
fn build_service_config(config: &Config) -> ServiceConfig {
    let png_compression = match config.png_compression {
        0..=3 => PngCompression::Fast,
        4..=6 => PngCompression::Default,
        _ => PngCompression::Best,
    };

    ServiceConfig {
        source_cache_entries: config.cache_sources,
        output_cache_bytes: config.cache_outputs,
        info_cache_entries: 1024,
        max_concurrent_transforms: config.max_concurrent,
        limits: SizeLimits {
            max_width: config.max_width,
            max_height: config.max_height,
            max_area: config.max_area,
        },
        encode: EncodeOptions {
            jpeg_quality: config.jpeg_quality,
            png_compression,
        },
        // validate() ran before this, so the color is well-formed
        background: config.parse_background().unwrap_or(None),
    }
}
