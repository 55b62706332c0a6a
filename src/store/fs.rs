//! Filesystem image store.
//!
//! Identifiers map to files in a single configured directory. An
//! identifier that already names an accepted extension is looked up
//! directly; otherwise the accepted extensions are probed in order and
//! the first existing file wins.
//!
//! Identifiers containing path delimiters are rejected outright so a
//! request can never escape the image directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

use super::ImageSource;

/// Source file extensions probed when the identifier carries none.
pub const ACCEPTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "tif", "tiff", "webp", "jp2"];

const PATH_DELIMITERS: [&str; 3] = ["..", "/", "\\"];

/// An image store backed by a local directory.
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an identifier to an existing file path.
    pub async fn resolve(&self, identifier: &str) -> Result<PathBuf, StoreError> {
        if identifier.is_empty() || PATH_DELIMITERS.iter().any(|d| identifier.contains(d)) {
            return Err(StoreError::InvalidIdentifier(identifier.to_string()));
        }

        // Identifier names a concrete file
        if has_accepted_extension(identifier) {
            let path = self.root.join(identifier);
            if file_exists(&path).await {
                return Ok(path);
            }
            return Err(StoreError::NotFound(identifier.to_string()));
        }

        // Probe extensions in preference order
        for ext in ACCEPTED_EXTENSIONS {
            let path = self.root.join(format!("{}.{}", identifier, ext));
            if file_exists(&path).await {
                return Ok(path);
            }
        }

        Err(StoreError::NotFound(identifier.to_string()))
    }
}

#[async_trait]
impl ImageSource for FsImageSource {
    async fn read(&self, identifier: &str) -> Result<Bytes, StoreError> {
        let path = self.resolve(identifier).await?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| StoreError::Read {
            identifier: identifier.to_string(),
            message: e.to_string(),
        })?;
        Ok(Bytes::from(bytes))
    }
}

fn has_accepted_extension(identifier: &str) -> bool {
    identifier
        .rsplit_once('.')
        .map(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================
