//! Cache behavior and singleflight coalescing against a real filesystem
//! store.

use std::sync::Arc;

use iiif_streamer::codec::CodecRegistry;
use iiif_streamer::iiif::parse_image_request;
use iiif_streamer::service::{ImageService, ServiceConfig};
use iiif_streamer::store::FsImageSource;

use super::test_utils::write_png;

fn service_over(
    dir: &tempfile::TempDir,
    config: ServiceConfig,
) -> ImageService<FsImageSource> {
    ImageService::with_config(
        FsImageSource::new(dir.path()),
        CodecRegistry::with_default_codecs(),
        config,
    )
}

#[tokio::test]
async fn test_concurrent_identical_requests_decode_and_transform_once() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 256, 256);
    let service = Arc::new(service_over(&dir, ServiceConfig::default()));

    let request = parse_image_request("page-1", "full", "!128,128", "90", "default.jpg").unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        let request = request.clone();
        handles.push(tokio::spawn(async move { service.render(&request).await }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let rendered = handle.await.unwrap().unwrap();
        bodies.push(rendered.bytes);
    }

    // All callers observed the same bytes from a single execution
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));

    let stats = service.stats().await;
    assert_eq!(stats.decode_executions, 1, "expected exactly one decode");
    assert_eq!(stats.transform_executions, 1, "expected exactly one transform");
}

#[tokio::test]
async fn test_distinct_requests_do_not_coalesce() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 128, 128);
    let service = service_over(&dir, ServiceConfig::default());

    let a = parse_image_request("page-1", "full", "max", "0", "default.jpg").unwrap();
    let b = parse_image_request("page-1", "full", "max", "90", "default.jpg").unwrap();

    service.render(&a).await.unwrap();
    service.render(&b).await.unwrap();

    let stats = service.stats().await;
    // One shared decode, two distinct transforms
    assert_eq!(stats.decode_executions, 1);
    assert_eq!(stats.transform_executions, 2);
}

#[tokio::test]
async fn test_source_cache_is_shared_across_requests() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let service = service_over(&dir, ServiceConfig::default());

    for rotation in ["0", "90", "180", "270"] {
        let request =
            parse_image_request("page-1", "full", "max", rotation, "default.jpg").unwrap();
        service.render(&request).await.unwrap();
    }

    let stats = service.stats().await;
    assert_eq!(stats.decode_executions, 1);
    assert_eq!(stats.transform_executions, 4);
    assert_eq!(stats.cached_outputs, 4);
}

#[tokio::test]
async fn test_source_cache_evicts_by_entry_count() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        write_png(&dir, &format!("img-{}.png", i), 32, 32);
    }
    let service = service_over(
        &dir,
        ServiceConfig {
            source_cache_entries: 2,
            ..Default::default()
        },
    );

    for i in 0..3 {
        service.decoded(&format!("img-{}", i)).await.unwrap();
    }
    assert_eq!(service.stats().await.cached_sources, 2);
    assert_eq!(service.stats().await.decode_executions, 3);

    // img-0 was evicted; touching it decodes again
    service.decoded("img-0").await.unwrap();
    assert_eq!(service.stats().await.decode_executions, 4);
}

#[tokio::test]
async fn test_output_cache_respects_byte_budget() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 256, 256);
    let service = service_over(
        &dir,
        ServiceConfig {
            // Small enough that a handful of outputs overflow it
            output_cache_bytes: 8 * 1024,
            ..Default::default()
        },
    );

    for rotation in ["0", "90", "180", "270", "45", "135"] {
        let request =
            parse_image_request("page-1", "full", "max", rotation, "default.jpg").unwrap();
        service.render(&request).await.unwrap();
    }

    let stats = service.stats().await;
    assert!(
        stats.output_bytes <= stats.output_capacity,
        "cache size {} exceeds budget {}",
        stats.output_bytes,
        stats.output_capacity
    );
}

#[tokio::test]
async fn test_cached_output_bytes_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let service = service_over(&dir, ServiceConfig::default());

    let request = parse_image_request("page-1", "square", "!50,50", "!22.5", "gray.png").unwrap();

    let first = service.render(&request).await.unwrap();
    let second = service.render(&request).await.unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.bytes, second.bytes);
    assert_eq!((first.width, first.height), (second.width, second.height));
}

#[tokio::test]
async fn test_flush_forces_recompute() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let service = service_over(&dir, ServiceConfig::default());

    let request = parse_image_request("page-1", "full", "max", "0", "default.png").unwrap();
    service.render(&request).await.unwrap();
    service.flush().await;

    let rendered = service.render(&request).await.unwrap();
    assert!(!rendered.cache_hit);
    assert_eq!(service.stats().await.decode_executions, 2);
}

#[tokio::test]
async fn test_failed_requests_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let service = service_over(&dir, ServiceConfig::default());

    // Out-of-bounds region fails after decode
    let request = parse_image_request("page-1", "100,100,10,10", "max", "0", "default.png").unwrap();
    assert!(service.render(&request).await.is_err());
    assert!(service.render(&request).await.is_err());

    let stats = service.stats().await;
    assert_eq!(stats.cached_outputs, 0);
    // The decoded source itself is still cached and reused
    assert_eq!(stats.decode_executions, 1);
}
