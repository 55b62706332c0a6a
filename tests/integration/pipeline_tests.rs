//! Pipeline property tests driven through the HTTP surface: geometry,
//! rotation, quality, and output encodings as a viewer would see them.

use http::StatusCode;

use super::test_utils::{get, json, test_app, write_png};

#[tokio::test]
async fn test_rotation_90_swaps_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 400, 300);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/full/max/90/default.png").await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 400));
}

#[tokio::test]
async fn test_rotation_0_is_pixel_identical_to_unrotated() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 120, 80);
    let app = test_app(&dir);

    let (_, _, a) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    // A different textual spelling of the same request
    let (_, _, b) = get(&app, "/iiif/3/page-1/pct:0,0,100,100/pct:100/0/default.png").await;

    let img_a = image::load_from_memory(&a).unwrap();
    let img_b = image::load_from_memory(&b).unwrap();
    assert_eq!(img_a.to_rgb8().as_raw(), img_b.to_rgb8().as_raw());
}

#[tokio::test]
async fn test_rotation_180_twice_restores_pixels() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 60, 40);
    let app = test_app(&dir);

    let (_, _, upright) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    let (_, _, once) = get(&app, "/iiif/3/page-1/full/max/180/default.png").await;

    let upright = image::load_from_memory(&upright).unwrap().to_rgb8();
    let once = image::load_from_memory(&once).unwrap();
    let twice = once.rotate180().to_rgb8();

    assert_eq!(upright.as_raw(), twice.as_raw());
}

#[tokio::test]
async fn test_arbitrary_rotation_expands_canvas() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/page-1/full/max/45/default.png").await;
    assert_eq!(status, StatusCode::OK);

    let decoded = image::load_from_memory(&body).unwrap();
    // A 100x100 square rotated 45 degrees needs a ~141x141 canvas
    assert!(decoded.width() > 100 && decoded.height() > 100);
    assert_eq!(decoded.width(), decoded.height());

    // PNG supports alpha, so the corners default to transparent
    let rgba = decoded.to_rgba8();
    assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
}

#[tokio::test]
async fn test_arbitrary_rotation_to_jpeg_has_opaque_background() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 100);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/full/max/45/default.jpg").await;
    let decoded = image::load_from_memory(&body).unwrap().to_rgb8();

    // JPEG has no alpha; corners fall back to white
    let corner = decoded.get_pixel(0, 0);
    assert!(corner.0.iter().all(|&c| c > 240), "corner {:?} not white", corner);
}

#[tokio::test]
async fn test_mirror_flips_horizontally() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 100, 50);
    let app = test_app(&dir);

    let (_, _, plain) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    let (_, _, mirrored) = get(&app, "/iiif/3/page-1/full/max/!0/default.png").await;

    let plain = image::load_from_memory(&plain).unwrap().to_rgb8();
    let mirrored = image::load_from_memory(&mirrored).unwrap().to_rgb8();

    assert_eq!(plain.get_pixel(0, 0), mirrored.get_pixel(99, 0));
    assert_eq!(plain.get_pixel(99, 10), mirrored.get_pixel(0, 10));
}

#[tokio::test]
async fn test_square_region_of_landscape() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 400, 300);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/square/max/0/default.png").await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 300));
}

#[tokio::test]
async fn test_pct_region_matches_pixel_region() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 400, 300);
    let app = test_app(&dir);

    let (_, _, pct) = get(&app, "/iiif/3/page-1/pct:25,25,50,50/max/0/default.png").await;
    let (_, _, px) = get(&app, "/iiif/3/page-1/100,75,200,150/max/0/default.png").await;

    let pct = image::load_from_memory(&pct).unwrap().to_rgb8();
    let px = image::load_from_memory(&px).unwrap().to_rgb8();
    assert_eq!(pct.as_raw(), px.as_raw());
}

#[tokio::test]
async fn test_gray_quality() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/full/max/0/gray.png").await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.color().channel_count(), 1);
}

#[tokio::test]
async fn test_bitonal_quality() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 64, 64);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/full/max/0/bitonal.png").await;
    let decoded = image::load_from_memory(&body).unwrap().to_luma8();
    assert!(decoded.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[tokio::test]
async fn test_output_formats_are_really_those_formats() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 32, 32);
    let app = test_app(&dir);

    let cases = [
        ("default.jpg", "image/jpeg", vec![0xFFu8, 0xD8]),
        ("default.png", "image/png", vec![0x89, b'P']),
        ("default.webp", "image/webp", b"RIFF".to_vec()),
        ("default.tif", "image/tiff", vec![0x49, 0x49]),
    ];

    for (suffix, media_type, magic) in cases {
        let uri = format!("/iiif/3/page-1/full/max/0/{}", suffix);
        let (status, headers, body) = get(&app, &uri).await;
        assert_eq!(status, StatusCode::OK, "{}", suffix);
        assert_eq!(headers["content-type"], media_type, "{}", suffix);
        assert!(body.starts_with(&magic), "{} magic mismatch", suffix);
    }
}

#[tokio::test]
async fn test_size_max_never_upscales_without_prefix() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 200, 100);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/full/max/0/default.png").await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert!(decoded.width() <= 200 && decoded.height() <= 100);
    assert_eq!((decoded.width(), decoded.height()), (200, 100));
}

#[tokio::test]
async fn test_exact_size_distorts_aspect() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 400, 300);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/full/100,100/0/default.png").await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 100));
}

#[tokio::test]
async fn test_legacy_full_size_spelling() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 50, 50);
    let app = test_app(&dir);

    // 2.0 viewers still send size=full
    let (status, _, body) = get(&app, "/iiif/2/page-1/full/full/0/default.png").await;
    assert_eq!(status, StatusCode::OK);
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (50, 50));
}

#[tokio::test]
async fn test_error_bodies_are_json() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 50, 50);
    let app = test_app(&dir);

    let (status, headers, body) = get(&app, "/iiif/3/page-1/full/max/9000/default.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers["content-type"].to_str().unwrap().contains("json"));
    let body = json(&body);
    assert!(body["message"].as_str().unwrap().contains("9000"));
}
