//! Parser for the four IIIF request path segments.
//!
//! `{region}/{size}/{rotation}/{quality}.{format}` is parsed into an
//! [`ImageRequest`] before any I/O happens. The parser is a pure function
//! over strings: it validates syntax and static ranges, and defers every
//! check that depends on actual pixel dimensions (empty clamped regions,
//! zero resolved sizes, upscaling) to the pipeline's resolution step.
//!
//! Numeric rules follow the Image API text: integers are plain digit runs
//! with no leading zeros beyond `"0"`, percentages and rotation degrees
//! may carry a decimal fraction, and no sign or exponent syntax is
//! accepted anywhere.

use crate::error::ParseError;

use super::request::{Format, ImageRequest, Quality, Region, Rotation, Size, SizeMode};

/// Parse the four path segments into a validated request descriptor.
pub fn parse_image_request(
    identifier: &str,
    region: &str,
    size: &str,
    rotation: &str,
    quality_format: &str,
) -> Result<ImageRequest, ParseError> {
    let region = parse_region(region)?;
    let size = parse_size(size)?;
    let rotation = parse_rotation(rotation)?;
    let (quality, format) = parse_quality_format(quality_format)?;

    Ok(ImageRequest {
        identifier: identifier.to_string(),
        region,
        size,
        rotation,
        quality,
        format,
    })
}

// =============================================================================
// Region
// =============================================================================

/// Parse the region segment.
///
/// Grammar: `full` | `square` | `x,y,w,h` | `pct:x,y,w,h`.
/// Percent coordinates must lie in [0, 100]. Empty rectangles (zero width
/// or height) are accepted here and rejected as `OutOfBounds` once the
/// region is resolved against the source.
pub fn parse_region(segment: &str) -> Result<Region, ParseError> {
    match segment {
        "full" => return Ok(Region::Full),
        "square" => return Ok(Region::Square),
        _ => {}
    }

    if let Some(rest) = segment.strip_prefix("pct:") {
        let values = parse_decimal_list(rest, 4)
            .ok_or_else(|| ParseError::InvalidRegion(segment.to_string()))?;
        if values.iter().any(|&v| !(0.0..=100.0).contains(&v)) {
            return Err(ParseError::InvalidRegion(segment.to_string()));
        }
        return Ok(Region::Pct {
            x: values[0],
            y: values[1],
            width: values[2],
            height: values[3],
        });
    }

    let values = parse_integer_list(segment, 4)
        .ok_or_else(|| ParseError::InvalidRegion(segment.to_string()))?;
    Ok(Region::Pixels {
        x: values[0],
        y: values[1],
        width: values[2],
        height: values[3],
    })
}

// =============================================================================
// Size
// =============================================================================

/// Parse the size segment.
///
/// Grammar: `max` | `w,` | `,h` | `w,h` | `!w,h` | `pct:n`, each optionally
/// prefixed by `^` to permit upscaling. The 2.0 legacy literal `full` is
/// accepted and treated as `max`.
pub fn parse_size(segment: &str) -> Result<Size, ParseError> {
    let (body, upscale) = match segment.strip_prefix('^') {
        Some(rest) => (rest, true),
        None => (segment, false),
    };

    let mode = parse_size_mode(body, segment)?;
    Ok(Size { mode, upscale })
}

fn parse_size_mode(body: &str, original: &str) -> Result<SizeMode, ParseError> {
    match body {
        "max" | "full" => return Ok(SizeMode::Max),
        _ => {}
    }

    if let Some(rest) = body.strip_prefix("pct:") {
        let n = parse_decimal(rest).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
        if n <= 0.0 {
            return Err(ParseError::InvalidSize(original.to_string()));
        }
        return Ok(SizeMode::Pct(n));
    }

    if let Some(rest) = body.strip_prefix('!') {
        let (w, h) = split_pair(rest).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
        let w = parse_integer(w).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
        let h = parse_integer(h).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
        return Ok(SizeMode::BestFit(w, h));
    }

    let (w, h) = split_pair(body).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
    match (w.is_empty(), h.is_empty()) {
        (false, true) => {
            let w = parse_integer(w).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
            Ok(SizeMode::Width(w))
        }
        (true, false) => {
            let h = parse_integer(h).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
            Ok(SizeMode::Height(h))
        }
        (false, false) => {
            let w = parse_integer(w).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
            let h = parse_integer(h).ok_or_else(|| ParseError::InvalidSize(original.to_string()))?;
            Ok(SizeMode::Exact(w, h))
        }
        (true, true) => Err(ParseError::InvalidSize(original.to_string())),
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Parse the rotation segment: an optional leading `!` (mirror) followed by
/// degrees in [0, 360). Degrees outside the range are a validation error
/// distinct from malformed syntax.
pub fn parse_rotation(segment: &str) -> Result<Rotation, ParseError> {
    let (body, mirror) = match segment.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (segment, false),
    };

    let degrees =
        parse_decimal(body).ok_or_else(|| ParseError::InvalidRotation(segment.to_string()))?;

    if degrees >= 360.0 {
        return Err(ParseError::RotationOutOfRange(degrees));
    }

    Ok(Rotation { degrees, mirror })
}

// =============================================================================
// Quality and format
// =============================================================================

/// Parse the trailing `{quality}.{format}` segment.
///
/// An unknown format extension yields [`ParseError::UnsupportedFormat`]
/// rather than a generic syntax error: the request may be valid IIIF that
/// this deployment simply does not serve (HTTP 415).
pub fn parse_quality_format(segment: &str) -> Result<(Quality, Format), ParseError> {
    let (quality, extension) = segment
        .rsplit_once('.')
        .ok_or_else(|| ParseError::MissingFormat(segment.to_string()))?;

    let quality = Quality::from_literal(quality)?;
    let format = Format::from_extension(extension)
        .ok_or_else(|| ParseError::UnsupportedFormat(extension.to_string()))?;

    Ok((quality, format))
}

// =============================================================================
// Numeric helpers
// =============================================================================

/// Parse a non-negative integer: a digit run with no leading zeros beyond
/// a lone `"0"`. Rejects signs, whitespace, and overflow.
fn parse_integer(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

/// Parse a non-negative decimal number: digits with at most one `.` and at
/// least one digit overall. Rejects signs, exponents, and bare dots.
fn parse_decimal(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let mut dots = 0usize;
    let mut digits = 0usize;
    for b in s.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    s.parse().ok()
}

fn parse_integer_list(s: &str, count: usize) -> Option<Vec<u32>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != count {
        return None;
    }
    parts.iter().map(|p| parse_integer(p)).collect()
}

fn parse_decimal_list(s: &str, count: usize) -> Option<Vec<f64>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != count {
        return None;
    }
    parts.iter().map(|p| parse_decimal(p)).collect()
}

/// Split on exactly one comma, keeping empty sides (`"w,"` and `",h"`).
fn split_pair(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.splitn(3, ',');
    let first = parts.next()?;
    let second = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

// =============================================================================
// Tests
// =============================================================================
