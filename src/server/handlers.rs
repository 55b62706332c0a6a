//! HTTP request handlers for the IIIF Image API.
//!
//! # Endpoints
//!
//! - `GET /iiif/{version}/{identifier}/info.json` - Capability document
//! - `GET /iiif/{version}/{identifier}/{region}/{size}/{rotation}/{quality}.{format}` - Image
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{CodecError, ImageServiceError, ParseError, TransformError};
use crate::iiif::{build_info, parse_image_request, ApiVersion, Capabilities};
use crate::service::ImageService;
use crate::store::ImageSource;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers via Axum's State
/// extractor.
pub struct AppState<S: ImageSource> {
    /// The image service handling decode/transform/encode
    pub service: Arc<ImageService<S>>,

    /// Capabilities advertised in info documents
    pub caps: Capabilities,

    /// Externally visible base URL used to build document ids
    pub base_url: String,

    /// Cache-Control max-age in seconds for successful responses
    pub cache_max_age: u32,
}

impl<S: ImageSource> AppState<S> {
    pub fn new(service: ImageService<S>, caps: Capabilities, base_url: impl Into<String>) -> Self {
        Self {
            service: Arc::new(service),
            caps,
            base_url: base_url.into(),
            cache_max_age: 3600,
        }
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }
}

impl<S: ImageSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            caps: self.caps,
            base_url: self.base_url.clone(),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Handler-level error: either a service error or a request addressed to
/// an API version this server does not speak.
pub enum HandlerError {
    Service(ImageServiceError),
    UnsupportedVersion(String),
}

impl From<ImageServiceError> for HandlerError {
    fn from(err: ImageServiceError) -> Self {
        HandlerError::Service(err)
    }
}

impl From<ParseError> for HandlerError {
    fn from(err: ParseError) -> Self {
        HandlerError::Service(ImageServiceError::Parse(err))
    }
}

/// Select the HTTP status and error identifier for a service error.
fn classify(err: &ImageServiceError) -> (StatusCode, &'static str) {
    match err {
        ImageServiceError::Parse(ParseError::UnsupportedFormat(_)) => {
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
        }
        ImageServiceError::Parse(_) => (StatusCode::BAD_REQUEST, "invalid_request"),

        ImageServiceError::Transform(TransformError::OutOfBounds { .. }) => {
            (StatusCode::BAD_REQUEST, "out_of_bounds")
        }
        ImageServiceError::Transform(_) => (StatusCode::BAD_REQUEST, "unsupported_parameter"),

        ImageServiceError::UnknownIdentifier(_) => (StatusCode::NOT_FOUND, "not_found"),

        ImageServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),

        ImageServiceError::Codec(CodecError::Encode { .. })
        | ImageServiceError::Codec(CodecError::EncodeUnsupported(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
        }
        ImageServiceError::Codec(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),

        ImageServiceError::Busy => (StatusCode::SERVICE_UNAVAILABLE, "server_busy"),
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            HandlerError::Service(err) => {
                let (status, error_type) = classify(&err);
                (status, error_type, err.to_string())
            }
            HandlerError::UnsupportedVersion(version) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("unsupported API version: {:?} (use 2 or 3)", version),
            ),
        };

        // Log errors based on severity
        if status.is_server_error() {
            error!(error_type, status = status.as_u16(), "Server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(error_type, status = status.as_u16(), "Resource not found: {}", message);
        } else if status.is_client_error() {
            warn!(error_type, status = status.as_u16(), "Client error: {}", message);
        }

        let body = ErrorResponse::with_status(error_type, message, status);
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn parse_version(segment: &str) -> Result<ApiVersion, HandlerError> {
    ApiVersion::from_path_segment(segment)
        .ok_or_else(|| HandlerError::UnsupportedVersion(segment.to_string()))
}

/// Handle capability document requests.
///
/// # Endpoint
///
/// `GET /iiif/{version}/{identifier}/info.json`
///
/// # Response
///
/// - `200 OK`: the Image Information document in the requested version's
///   serialization, with `Content-Type: application/json`
/// - `404 Not Found`: unknown identifier or unsupported API version
/// - `500 Internal Server Error`: the source exists but its dimensions
///   cannot be probed
pub async fn info_handler<S: ImageSource>(
    State(state): State<AppState<S>>,
    // Axum percent-decodes path parameters before extraction
    Path((version, identifier)): Path<(String, String)>,
) -> Result<Response, HandlerError> {
    let version = parse_version(&version)?;

    let (width, height) = state.service.source_info(&identifier).await?;
    let document = build_info(version, &state.base_url, &identifier, width, height, &state.caps);

    let body = serde_json::to_vec(&document).map_err(|e| {
        HandlerError::Service(ImageServiceError::Codec(CodecError::Encode {
            format: "json",
            message: e.to_string(),
        }))
    })?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .body(axum::body::Body::from(body))
        .unwrap();

    Ok(response)
}

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /iiif/{version}/{identifier}/{region}/{size}/{rotation}/{quality}.{format}`
///
/// # Response
///
/// - `200 OK`: the transformed image with its format's `Content-Type`, a
///   `Link` header pointing at the image's info.json, and an
///   `X-Cache-Hit` header
/// - `400 Bad Request`: malformed segment, empty region, or denied
///   upscaling
/// - `404 Not Found`: unknown identifier or unsupported API version
/// - `415 Unsupported Media Type`: unknown output format
/// - `500 Internal Server Error`: decode or encode failure
/// - `503 Service Unavailable`: transformation capacity exhausted
pub async fn image_handler<S: ImageSource>(
    State(state): State<AppState<S>>,
    Path((version, identifier, region, size, rotation, quality_format)): Path<(
        String,
        String,
        String,
        String,
        String,
        String,
    )>,
) -> Result<Response, HandlerError> {
    let version = parse_version(&version)?;

    let request = parse_image_request(&identifier, &region, &size, &rotation, &quality_format)?;
    let rendered = state.service.render(&request).await?;

    let info_link = format!(
        "<{}/iiif/{}/{}/info.json>;rel=\"profile\";type=\"application/ld+json\"",
        state.base_url.trim_end_matches('/'),
        version.as_str(),
        urlencoding::encode(&identifier),
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, rendered.media_type)
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .header(header::LINK, info_link)
        .header("X-Cache-Hit", rendered.cache_hit.to_string())
        .body(axum::body::Body::from(rendered.bytes))
        .unwrap();

    Ok(response)
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
