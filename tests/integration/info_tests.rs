//! Tests for the info.json capability documents served over HTTP.

use http::StatusCode;

use super::test_utils::{get, json, test_app, write_png};

#[tokio::test]
async fn test_v3_info_document() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 1024, 768);
    let app = test_app(&dir);

    let (status, headers, body) = get(&app, "/iiif/3/page-1/info.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["cache-control"], "public, max-age=3600");

    let info = json(&body);
    assert_eq!(info["@context"], "http://iiif.io/api/image/3/context.json");
    assert_eq!(info["id"], "http://localhost:3000/iiif/3/page-1");
    assert_eq!(info["type"], "ImageService3");
    assert_eq!(info["protocol"], "http://iiif.io/api/image");
    assert_eq!(info["profile"], "level2");
    assert_eq!(info["width"], 1024);
    assert_eq!(info["height"], 768);
}

#[tokio::test]
async fn test_v3_scale_factors_are_powers_of_two() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 1024, 768);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/info.json").await;
    let info = json(&body);

    // 1024/4 = 256 is still a full tile; 1024/8 = 128 is not
    assert_eq!(info["tiles"][0]["scaleFactors"], serde_json::json!([1, 2, 4]));
    assert_eq!(info["tiles"][0]["width"], 256);

    // Advertised sizes are ascending, ending at native resolution
    let sizes = info["sizes"].as_array().unwrap();
    assert_eq!(sizes.last().unwrap()["width"], 1024);
    assert_eq!(sizes.last().unwrap()["height"], 768);
}

#[tokio::test]
async fn test_v3_advertised_features() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 512, 512);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/info.json").await;
    let info = json(&body);

    assert_eq!(info["preferredFormats"], serde_json::json!(["jpg", "png", "webp"]));
    assert_eq!(info["extraQualities"], serde_json::json!(["color", "gray", "bitonal"]));

    let features = info["extraFeatures"].as_array().unwrap();
    for feature in ["arbitraryRotation", "mirroring", "regionSquare", "sizeUpscaling"] {
        assert!(
            features.contains(&serde_json::json!(feature)),
            "missing feature {}",
            feature
        );
    }

    assert_eq!(info["maxWidth"], 10_000);
    assert_eq!(info["maxHeight"], 10_000);
    assert_eq!(info["maxArea"], 100_000_000);
}

#[tokio::test]
async fn test_v2_info_document() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 1024, 768);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/2/page-1/info.json").await;
    assert_eq!(status, StatusCode::OK);

    let info = json(&body);
    assert_eq!(info["@context"], "http://iiif.io/api/image/2/context.json");
    assert_eq!(info["@id"], "http://localhost:3000/iiif/2/page-1");
    assert!(info.get("id").is_none());
    assert!(info.get("type").is_none());

    assert_eq!(info["profile"][0], "http://iiif.io/api/image/2/level2.json");
    assert!(info["profile"][1]["formats"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("jpg")));
    assert!(info["profile"][1]["supports"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("sizeAboveFull")));
}

#[tokio::test]
async fn test_info_unknown_identifier_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/missing/info.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "not_found");
}

#[tokio::test]
async fn test_info_dimensions_match_image_requests() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page-1.png", 300, 200);
    let app = test_app(&dir);

    let (_, _, body) = get(&app, "/iiif/3/page-1/info.json").await;
    let info = json(&body);

    let uri = "/iiif/3/page-1/full/max/0/default.png";
    let (_, _, image_body) = get(&app, uri).await;
    let decoded = image::load_from_memory(&image_body).unwrap();

    assert_eq!(info["width"], decoded.width());
    assert_eq!(info["height"], decoded.height());
}

#[tokio::test]
async fn test_info_for_encoded_identifier() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir, "page 1.png", 64, 64);
    let app = test_app(&dir);

    let (status, _, body) = get(&app, "/iiif/3/page%201/info.json").await;
    assert_eq!(status, StatusCode::OK);
    // The id round-trips the encoding
    assert_eq!(json(&body)["id"], "http://localhost:3000/iiif/3/page%201");
}
