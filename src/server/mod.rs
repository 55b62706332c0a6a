//! HTTP server layer.
//!
//! Thin plumbing around the image service: route definitions, request
//! extraction, error-to-status mapping, CORS, and response headers. The
//! IIIF semantics all live below this layer.

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, image_handler, info_handler, AppState, ErrorResponse, HandlerError,
    HealthResponse,
};
pub use routes::{create_router, RouterConfig};
