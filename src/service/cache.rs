//! Caches for decoded sources and rendered outputs.
//!
//! Two independent LRU caches with different economics:
//!
//! - [`SourceCache`] holds decoded pixel buffers. Decodes are the
//!   expensive step, so these entries get priority and are bounded by
//!   entry count (a decoded buffer's size is roughly predictable from the
//!   configured limits).
//! - [`OutputCache`] holds encoded transform results. They are cheap to
//!   recompute from a cached source, so they are bounded by total byte
//!   size and evicted freely.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use lru::LruCache;
use tokio::sync::RwLock;

/// A fully rendered response: encoded bytes plus the metadata the HTTP
/// layer needs. Cloning is cheap (`Bytes` is reference-counted).
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// The encoded image data
    pub bytes: Bytes,

    /// MIME type of the encoding
    pub media_type: &'static str,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Whether this response was served from the output cache
    pub cache_hit: bool,
}

// =============================================================================
// Source cache
// =============================================================================

/// Count-bounded LRU cache of decoded source buffers, shared read-only
/// via `Arc`.
pub struct SourceCache {
    cache: RwLock<LruCache<String, Arc<DynamicImage>>>,
}

impl SourceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        }
    }

    pub async fn get(&self, identifier: &str) -> Option<Arc<DynamicImage>> {
        let mut cache = self.cache.write().await;
        cache.get(identifier).cloned()
    }

    pub async fn put(&self, identifier: &str, image: Arc<DynamicImage>) {
        let mut cache = self.cache.write().await;
        cache.put(identifier.to_string(), image);
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }
}

// =============================================================================
// Output cache
// =============================================================================

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Byte-size-bounded LRU cache of rendered outputs, keyed by
/// `identifier/canonical-request`.
pub struct OutputCache {
    cache: RwLock<LruCache<String, RenderedImage>>,
    max_bytes: usize,
    current_bytes: RwLock<usize>,
}

impl OutputCache {
    pub fn new(max_bytes: usize) -> Self {
        Self::with_max_entries(max_bytes, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_bytes: usize, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries.max(1)).unwrap(),
            )),
            max_bytes,
            current_bytes: RwLock::new(0),
        }
    }

    /// Get a rendered output, marking it recently used.
    pub async fn get(&self, key: &str) -> Option<RenderedImage> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Store a rendered output, evicting least-recently-used entries until
    /// the cache fits its byte budget again.
    pub async fn put(&self, key: String, rendered: RenderedImage) {
        let added = rendered.bytes.len();
        let mut cache = self.cache.write().await;
        let mut current = self.current_bytes.write().await;

        if let Some(old) = cache.peek(&key) {
            *current = current.saturating_sub(old.bytes.len());
        }

        cache.put(key, rendered);
        *current += added;

        while *current > self.max_bytes {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current = current.saturating_sub(evicted.bytes.len());
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn size(&self) -> usize {
        *self.current_bytes.read().await
    }

    pub fn capacity(&self) -> usize {
        self.max_bytes
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current = self.current_bytes.write().await;
        cache.clear();
        *current = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
