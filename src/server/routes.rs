//! Router configuration for the IIIF server.
//!
//! # Route Structure
//!
//! ```text
//! /health                                                               - Health check
//! /iiif/{version}/{identifier}/info.json                                - Capability document
//! /iiif/{version}/{identifier}/{region}/{size}/{rotation}/{q}.{format}  - Image request
//! ```
//!
//! The `{version}` segment selects the Image API serialization (2 or 3);
//! both families are always mounted, matching how viewers probe servers.

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::store::ImageSource;

use super::handlers::{health_handler, image_handler, info_handler, AppState};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Defaults: any CORS origin, tracing enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Restrict CORS to specific origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router<S>(state: AppState<S>, config: RouterConfig) -> Router
where
    S: ImageSource + 'static,
{
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/iiif/{version}/{identifier}/info.json",
            get(info_handler::<S>),
        )
        .route(
            "/iiif/{version}/{identifier}/{region}/{size}/{rotation}/{quality_format}",
            get(image_handler::<S>),
        )
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer. IIIF viewers are browser applications on other
/// origins, so GET is open to any origin unless restricted.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
