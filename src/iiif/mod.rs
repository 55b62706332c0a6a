//! IIIF Image API request model, grammar parser, and capability documents.
//!
//! This module owns everything that is defined by the Image API text
//! rather than by pixels: the typed request descriptors, the segment
//! parser that builds them, and the `info.json` serializations for the
//! 2.0 and 3.0 protocol versions.
//!
//! # Components
//!
//! - [`ImageRequest`] and its tagged segment types ([`Region`], [`Size`],
//!   [`Rotation`], [`Quality`], [`Format`])
//! - [`parse_image_request`]: pure parser from path segments to a request
//! - [`build_info`] / [`InfoDocument`]: version-selected capability
//!   documents
//! - [`ApiVersion`], [`Capabilities`], [`scale_factors`]

mod info;
mod parse;
mod request;

pub use info::{
    build_info, scale_factors, ApiVersion, Capabilities, ImageInfoV2, ImageInfoV3, InfoDocument,
    ProfileDetailV2, SizeEntry, TileSet,
};
pub use parse::{
    parse_image_request, parse_quality_format, parse_region, parse_rotation, parse_size,
};
pub use request::{Format, ImageRequest, Quality, Region, Rotation, Size, SizeMode};
