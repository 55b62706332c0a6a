//! Image store abstraction.
//!
//! The engine needs exactly one operation from storage: resolve an opaque
//! identifier to the source image's bytes. The [`ImageSource`] trait keeps
//! the rest of the system independent of where images live; the shipped
//! implementation is a local directory ([`FsImageSource`]), and tests use
//! in-memory sources.

mod fs;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use fs::{FsImageSource, ACCEPTED_EXTENSIONS};

/// A source of image bytes addressed by opaque identifiers.
#[async_trait]
pub trait ImageSource: Send + Sync + 'static {
    /// Read the complete source bytes for an identifier.
    ///
    /// Returns [`StoreError::NotFound`] when the identifier does not
    /// resolve to an image.
    async fn read(&self, identifier: &str) -> Result<Bytes, StoreError>;
}
