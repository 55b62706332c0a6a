//! End-to-end tests of the HTTP API: request handling, headers, and the
//! error taxonomy.

use http::StatusCode;

use super::test_utils::{get, gradient_image, json, test_app, write_png};

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_full_image_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 400, 300);
    let app = test_app(&dir);

    let (status, headers, body) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/png");

    // Identity request returns the native dimensions and pixels
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 300));
    assert_eq!(decoded.to_rgb8().as_raw(), gradient_image(400, 300).to_rgb8().as_raw());
}

#[tokio::test]
async fn test_image_response_headers() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let app = test_app(&dir);

    let (_, headers, _) = get(&app, "/iiif/3/page-1/full/max/0/default.jpg").await;
    assert_eq!(headers["content-type"], "image/jpeg");
    assert_eq!(headers["cache-control"], "public, max-age=3600");
    assert_eq!(headers["x-cache-hit"], "false");

    let link = headers["link"].to_str().unwrap();
    assert!(link.contains("/iiif/3/page-1/info.json"));
    assert!(link.contains("rel=\"profile\""));
}

#[tokio::test]
async fn test_repeated_request_hits_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let app = test_app(&dir);

    let (_, headers, first) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    assert_eq!(headers["x-cache-hit"], "false");

    let (_, headers, second) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    assert_eq!(headers["x-cache-hit"], "true");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_scaling_and_region() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 400, 300);
    let app = test_app(&dir);

    // Best-fit into 100x100 keeps the aspect ratio
    let (status, _, body) = get(&app, "/iiif/3/page-1/full/!100,100/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 75));

    // Region then size: pct:50 applies to the region
    let (status, _, body) = get(&app, "/iiif/3/page-1/0,0,200,300/pct:50/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 150));
}

#[tokio::test]
async fn test_identifier_with_percent_encoding() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page 1.png", 32, 32);
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/3/page%201/full/max/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_identifier_without_extension_probes() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "scan.png", 32, 32);
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/3/scan/full/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Error taxonomy
// =============================================================================

#[tokio::test]
async fn test_unknown_identifier_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/missing/full/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "not_found");
}

#[tokio::test]
async fn test_path_traversal_identifier_is_404() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 32, 32);
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/3/..%2Fpage-1/full/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_region_is_400() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/page-1/bogus/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_request");
}

#[tokio::test]
async fn test_zero_width_region_is_400_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/page-1/0,0,0,50/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "out_of_bounds");
}

#[tokio::test]
async fn test_upscale_without_prefix_is_400() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/page-1/full/110,/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "unsupported_parameter");

    // The same size with the ^ prefix succeeds
    let (status, _, _) = get(&app, "/iiif/3/page-1/full/%5E110,/0/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotation_out_of_range_is_400() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/3/page-1/full/max/360/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_quality_is_400() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/3/page-1/full/max/0/sepia.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_format_is_415() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/page-1/full/max/0/default.gif").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json(&body)["error"], "unsupported_format");
}

#[tokio::test]
async fn test_corrupt_source_is_500() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.png"), b"not a png at all").unwrap();
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/3/broken/full/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unsupported_api_version_is_404() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 32, 32);
    let app = test_app(&dir);

    let (status, _, _) = get(&app, "/iiif/9/page-1/full/max/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get(&app, "/iiif/9/page-1/info.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_both_version_families_serve_images() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 32, 32);
    let app = test_app(&dir);

    for version in ["2", "3"] {
        let uri = format!("/iiif/{}/page-1/full/max/0/default.jpg", version);
        let (status, _, _) = get(&app, &uri).await;
        assert_eq!(status, StatusCode::OK, "version {}", version);
    }
}
