use thiserror::Error;

/// Errors produced while parsing the four IIIF request segments.
///
/// These are pure syntax/validation errors: the parser never performs I/O,
/// so every variant maps to a client-side HTTP status (400 or 415).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Region segment does not match `full`, `square`, `x,y,w,h` or `pct:x,y,w,h`
    #[error("invalid region parameter: {0:?}")]
    InvalidRegion(String),

    /// Size segment does not match `max`, `w,`, `,h`, `w,h`, `!w,h` or `pct:n`
    #[error("invalid size parameter: {0:?}")]
    InvalidSize(String),

    /// Rotation segment is not an optional `!` followed by a decimal number
    #[error("invalid rotation parameter: {0:?}")]
    InvalidRotation(String),

    /// Rotation is syntactically valid but outside [0, 360)
    #[error("rotation out of range: {0} (must be at least 0 and less than 360)")]
    RotationOutOfRange(f64),

    /// Quality literal is not one of `color`, `gray`, `bitonal`, `default`
    #[error("invalid quality parameter: {0:?}")]
    InvalidQuality(String),

    /// Final segment has no `.format` suffix
    #[error("missing format suffix: {0:?}")]
    MissingFormat(String),

    /// Format suffix is valid IIIF syntax but not supported by this server
    /// (should map to HTTP 415, not 400)
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(String),
}

/// Errors from the image store when resolving an identifier to bytes.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No source image exists for the identifier
    #[error("image not found: {0}")]
    NotFound(String),

    /// Identifier contains path delimiters and was refused
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Underlying read failed
    #[error("read error for {identifier}: {message}")]
    Read { identifier: String, message: String },
}

/// Errors from the format codec layer.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Source bytes did not match any registered codec's signature
    #[error("unrecognized source image format")]
    UnknownSourceFormat,

    /// Source matched a codec but could not be decoded
    #[error("decode failed ({format}): {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    /// Encoding the output buffer failed
    #[error("encode failed ({format}): {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    /// The codec can decode this format but not encode it
    #[error("encoding to {0} is not supported")]
    EncodeUnsupported(&'static str),
}

/// Errors from resolving and applying the transformation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The requested region clamps to an empty rectangle
    #[error("region out of bounds: {x},{y},{width},{height} against {source_width}x{source_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    /// Requested size exceeds the region and no `^` prefix was given
    #[error(
        "upscaling denied: requested {requested_width}x{requested_height} from \
         {available_width}x{available_height} without the ^ prefix"
    )]
    UpscalingDenied {
        requested_width: u32,
        requested_height: u32,
        available_width: u32,
        available_height: u32,
    },

    /// Resolved size is zero in at least one dimension
    #[error("size resolves to an empty image: {width}x{height}")]
    EmptySize { width: u32, height: u32 },

    /// Resolved size exceeds the server's configured limits
    #[error("size {width}x{height} exceeds server limits ({max_width}x{max_height}, area {max_area})")]
    SizeExceedsLimits {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
        max_area: u64,
    },
}

/// Top-level error for the image service, carrying enough structure for the
/// HTTP layer to select a status code.
#[derive(Debug, Clone, Error)]
pub enum ImageServiceError {
    /// Request segments failed to parse or validate
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The identifier does not resolve to a source image
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// Store failure other than a missing identifier
    #[error(transparent)]
    Store(StoreError),

    /// Decode or encode failure in the codec layer
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Geometry resolution or pipeline failure
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The in-flight transformation bound is exhausted
    #[error("server busy: transformation capacity exhausted")]
    Busy,
}

impl From<StoreError> for ImageServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) | StoreError::InvalidIdentifier(id) => {
                ImageServiceError::UnknownIdentifier(id)
            }
            other => ImageServiceError::Store(other),
        }
    }
}
