//! Image service: the orchestrator behind every request.
//!
//! The service owns the caches, the codec registry, and the concurrency
//! bound, and runs the decode/transform/encode chain on the blocking
//! pool. It guarantees at most one concurrent decode per identifier and
//! at most one concurrent transform per canonical request: concurrent
//! identical requests coalesce onto a single in-flight computation and
//! all receive its result, errors included: a failed computation is
//! reported, never retried and never cached.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        ImageService                           │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │                      render()                           │  │
//! │  │  1. Output cache lookup    4. Decode (shared, cached)   │  │
//! │  │  2. Coalesce duplicates    5. Transform + encode        │  │
//! │  │  3. Acquire worker permit  6. Cache & return            │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │        │                 │                    │               │
//! │        ▼                 ▼                    ▼               │
//! │  ┌───────────┐    ┌─────────────┐    ┌────────────────┐      │
//! │  │OutputCache│    │ SourceCache │    │ CodecRegistry  │      │
//! │  └───────────┘    └─────────────┘    └────────────────┘      │
//! └───────────────────────────────────────────────────────────────┘
//! ```

mod cache;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use image::{DynamicImage, Rgba};
use lru::LruCache;
use tokio::sync::{Notify, RwLock, Semaphore};
use tracing::debug;

use crate::codec::{CodecRegistry, EncodeOptions};
use crate::error::{CodecError, ImageServiceError};
use crate::iiif::{Format, ImageRequest};
use crate::pipeline::{transform, SizeLimits, TransformOptions};
use crate::store::ImageSource;

pub use cache::{OutputCache, RenderedImage, SourceCache};

// =============================================================================
// Configuration
// =============================================================================

/// Tunables for an [`ImageService`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Decoded source buffers to keep (entry count)
    pub source_cache_entries: usize,

    /// Rendered output budget in bytes
    pub output_cache_bytes: usize,

    /// Probed dimension entries to keep
    pub info_cache_entries: usize,

    /// Bound on concurrently executing transformations
    pub max_concurrent_transforms: usize,

    /// Output size limits
    pub limits: SizeLimits,

    /// Encoder parameters
    pub encode: EncodeOptions,

    /// Background fill override for expanded rotation canvases. `None`
    /// selects transparent for alpha-capable formats and white otherwise.
    pub background: Option<[u8; 4]>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            source_cache_entries: 32,
            output_cache_bytes: 100 * 1024 * 1024,
            info_cache_entries: 1024,
            max_concurrent_transforms: 16,
            limits: SizeLimits {
                max_width: 10_000,
                max_height: 10_000,
                max_area: 100_000_000,
            },
            encode: EncodeOptions::default(),
            background: None,
        }
    }
}

// =============================================================================
// Singleflight
// =============================================================================

/// One in-flight computation that concurrent identical requests attach to.
struct Flight<T> {
    notify: Notify,
    result: StdMutex<Option<Result<T, ImageServiceError>>>,
}

impl<T> Flight<T> {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: StdMutex::new(None),
        }
    }
}

type FlightMap<T> = StdMutex<HashMap<String, Arc<Flight<T>>>>;

/// Removes the in-flight entry and wakes waiters when the leader finishes
/// or is cancelled. On cancellation the result is still empty, which
/// sends waiters back to compete for leadership instead of wedging them.
struct FlightGuard<'a, T> {
    flights: &'a FlightMap<T>,
    key: &'a str,
    flight: Arc<Flight<T>>,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap();
        if let Some(current) = flights.get(self.key) {
            if Arc::ptr_eq(current, &self.flight) {
                flights.remove(self.key);
            }
        }
        drop(flights);
        self.flight.notify.notify_waiters();
    }
}

/// Run `compute` at most once per key across concurrent callers; everyone
/// gets a clone of the single result.
async fn singleflight<T, F, Fut>(
    flights: &FlightMap<T>,
    key: &str,
    compute: F,
) -> Result<T, ImageServiceError>
where
    T: Clone,
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ImageServiceError>>,
{
    loop {
        let leader;
        let flight = {
            let mut map = flights.lock().unwrap();
            match map.get(key) {
                Some(flight) => {
                    leader = false;
                    flight.clone()
                }
                None => {
                    let flight = Arc::new(Flight::new());
                    map.insert(key.to_string(), flight.clone());
                    leader = true;
                    flight
                }
            }
        };

        if leader {
            // Compute under a guard so cancellation still removes the
            // entry and wakes the waiters
            let guard = FlightGuard { flights, key, flight };
            let result = compute().await;
            *guard.flight.result.lock().unwrap() = Some(result.clone());
            return result;
            // guard drops here: entry removed, waiters woken
        }

        // Register interest before checking the result so a completion
        // between the check and the await cannot be missed
        let notified = flight.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(result) = flight.result.lock().unwrap().clone() {
            return result;
        }

        notified.await;

        let result = flight.result.lock().unwrap().clone();
        if let Some(result) = result {
            return result;
        }
        // Leader was cancelled before producing a result; retry
    }
}

// =============================================================================
// Service stats
// =============================================================================

/// Cache and execution statistics, mainly for tests and observability.
#[derive(Debug, Clone, Copy)]
pub struct ServiceStats {
    pub cached_sources: usize,
    pub cached_outputs: usize,
    pub output_bytes: usize,
    pub output_capacity: usize,
    pub decode_executions: u64,
    pub transform_executions: u64,
}

// =============================================================================
// ImageService
// =============================================================================

/// Orchestrates decoding, transformation, encoding, and caching.
///
/// # Type Parameters
///
/// * `S` - The image source (filesystem store in production, in-memory
///   sources in tests)
pub struct ImageService<S: ImageSource> {
    source: S,
    codecs: Arc<CodecRegistry>,

    sources: SourceCache,
    outputs: OutputCache,
    infos: RwLock<LruCache<String, (u32, u32)>>,

    decode_flights: FlightMap<Arc<DynamicImage>>,
    render_flights: FlightMap<RenderedImage>,

    permits: Arc<Semaphore>,
    limits: SizeLimits,
    encode: EncodeOptions,
    background: Option<[u8; 4]>,

    transform_executions: Arc<AtomicU64>,
}

impl<S: ImageSource> ImageService<S> {
    /// Create a service with default settings.
    pub fn new(source: S, codecs: CodecRegistry) -> Self {
        Self::with_config(source, codecs, ServiceConfig::default())
    }

    /// Create a service with explicit configuration.
    pub fn with_config(source: S, codecs: CodecRegistry, config: ServiceConfig) -> Self {
        Self {
            source,
            codecs: Arc::new(codecs),
            sources: SourceCache::new(config.source_cache_entries),
            outputs: OutputCache::new(config.output_cache_bytes),
            infos: RwLock::new(LruCache::new(
                std::num::NonZeroUsize::new(config.info_cache_entries.max(1)).unwrap(),
            )),
            decode_flights: StdMutex::new(HashMap::new()),
            render_flights: StdMutex::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_transforms.max(1))),
            limits: config.limits,
            encode: config.encode,
            background: config.background,
            transform_executions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The output size limits this service enforces.
    pub fn limits(&self) -> SizeLimits {
        self.limits
    }

    /// Probe the native dimensions of a source image without a full
    /// decode, caching the answer.
    pub async fn source_info(&self, identifier: &str) -> Result<(u32, u32), ImageServiceError> {
        if let Some(&dims) = self.infos.write().await.get(identifier) {
            return Ok(dims);
        }

        let bytes = self.source.read(identifier).await?;
        let codecs = self.codecs.clone();
        let dims = tokio::task::spawn_blocking(move || codecs.probe(&bytes))
            .await
            .map_err(worker_failure)??;

        self.infos.write().await.put(identifier.to_string(), dims);
        Ok(dims)
    }

    /// Get the decoded source buffer, decoding at most once per
    /// identifier across concurrent callers.
    pub async fn decoded(&self, identifier: &str) -> Result<Arc<DynamicImage>, ImageServiceError> {
        if let Some(image) = self.sources.get(identifier).await {
            return Ok(image);
        }

        singleflight(&self.decode_flights, identifier, || {
            self.decode_uncached(identifier)
        })
        .await
    }

    async fn decode_uncached(&self, identifier: &str) -> Result<Arc<DynamicImage>, ImageServiceError> {
        // A previous leader may have populated the cache while this caller
        // was waiting for leadership
        if let Some(image) = self.sources.get(identifier).await {
            return Ok(image);
        }

        let bytes = self.source.read(identifier).await?;
        let codecs = self.codecs.clone();
        let image = tokio::task::spawn_blocking(move || codecs.decode(&bytes))
            .await
            .map_err(worker_failure)??;

        debug!(identifier, width = image.width(), height = image.height(), "decoded source");

        let image = Arc::new(image);
        self.sources.put(identifier, image.clone()).await;
        self.infos
            .write()
            .await
            .put(identifier.to_string(), (image.width(), image.height()));
        Ok(image)
    }

    /// Render a request, using the output cache and coalescing concurrent
    /// identical requests onto one computation.
    pub async fn render(&self, request: &ImageRequest) -> Result<RenderedImage, ImageServiceError> {
        let key = output_key(request);

        if let Some(mut hit) = self.outputs.get(&key).await {
            hit.cache_hit = true;
            return Ok(hit);
        }

        singleflight(&self.render_flights, &key, || {
            self.render_uncached(&key, request)
        })
        .await
    }

    async fn render_uncached(
        &self,
        key: &str,
        request: &ImageRequest,
    ) -> Result<RenderedImage, ImageServiceError> {
        if let Some(mut hit) = self.outputs.get(key).await {
            hit.cache_hit = true;
            return Ok(hit);
        }

        // Backpressure: reject rather than queue once the worker bound is
        // reached. The permit covers the blocking-pool section.
        let _permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| ImageServiceError::Busy)?;

        let source = self.decoded(&request.identifier).await?;

        let opts = TransformOptions {
            limits: self.limits,
            background: self.background_for(request.format),
        };
        let encode = self.encode;
        let codecs = self.codecs.clone();
        let counter = self.transform_executions.clone();
        let request = request.clone();

        let rendered = tokio::task::spawn_blocking(move || {
            let transformed = transform(&source, &request, &opts)?;
            counter.fetch_add(1, Ordering::SeqCst);
            let encoded = codecs.encode(request.format, &transformed, &encode)?;
            Ok::<_, ImageServiceError>(RenderedImage {
                bytes: encoded.bytes,
                media_type: encoded.media_type,
                width: transformed.width(),
                height: transformed.height(),
                cache_hit: false,
            })
        })
        .await
        .map_err(worker_failure)??;

        self.outputs.put(key.to_string(), rendered.clone()).await;
        Ok(rendered)
    }

    /// Background fill for rotations that expand the canvas: the
    /// configured override, else transparent where the output format has
    /// alpha, else white.
    fn background_for(&self, format: Format) -> Rgba<u8> {
        match self.background {
            Some(color) => Rgba(color),
            None if format.supports_alpha() => Rgba([0, 0, 0, 0]),
            None => Rgba([255, 255, 255, 255]),
        }
    }

    /// Drop every cached buffer and output (teardown / test isolation).
    pub async fn flush(&self) {
        self.sources.clear().await;
        self.outputs.clear().await;
        self.infos.write().await.clear();
    }

    /// Cache and execution counters.
    pub async fn stats(&self) -> ServiceStats {
        ServiceStats {
            cached_sources: self.sources.len().await,
            cached_outputs: self.outputs.len().await,
            output_bytes: self.outputs.size().await,
            output_capacity: self.outputs.capacity(),
            decode_executions: self.codecs.decode_executions(),
            transform_executions: self.transform_executions.load(Ordering::SeqCst),
        }
    }
}

/// Canonical output cache key for a request.
fn output_key(request: &ImageRequest) -> String {
    format!("{}/{}", request.identifier, request.canonical())
}

fn worker_failure(err: tokio::task::JoinError) -> ImageServiceError {
    ImageServiceError::Codec(CodecError::Encode {
        format: "worker",
        message: format!("blocking task failed: {}", err),
    })
}

// =============================================================================
// Tests
// =============================================================================
