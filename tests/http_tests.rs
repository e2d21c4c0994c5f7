use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pointserver::server::router;
use pointserver::{Config, Dataset, GeoJsonFiles};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const POINTS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]}, "properties": {"name": "a"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 1]}, "properties": {"name": "b"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [2, 2]}, "properties": {"name": "c"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10, 10]}, "properties": {"name": "d"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-5, -5]}, "properties": {"name": "e"}}
  ]
}"#;

fn setup() -> (TempDir, Arc<Dataset>) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("points.geojson"), POINTS).unwrap();
    let config = Config::default().with_watch(false);
    let source = GeoJsonFiles::new([dir.path()]).with_config(&config);
    let dataset = Arc::new(Dataset::open(source, &config).expect("Failed to open dataset"));
    (dir, dataset)
}

async fn get(dataset: &Arc<Dataset>, uri: &str) -> (StatusCode, Option<String>, String) {
    send(dataset, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn send(dataset: &Arc<Dataset>, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = router(Arc::clone(dataset)).oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

fn names(body: &str) -> Vec<String> {
    let json: Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    json["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"]["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_features_in_box() {
    let (_dir, dataset) = setup();
    let (status, content_type, body) = get(&dataset, "/features?bbox=0,0,2,2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        content_type.as_deref(),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(names(&body), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_nearest_within_radius() {
    let (_dir, dataset) = setup();
    let (status, _, body) = get(&dataset, "/nearest?point=1,1&radius=1.5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_empty_result_is_still_a_collection() {
    let (_dir, dataset) = setup();
    let (status, _, body) = get(&dataset, "/features?bbox=100,100,200,200").await;

    assert_eq!(status, StatusCode::OK);
    assert!(names(&body).is_empty());
}

#[tokio::test]
async fn test_malformed_box_is_bad_request() {
    let (_dir, dataset) = setup();
    let (status, _, body) = get(&dataset, "/features?bbox=1,2,3").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Error: "), "unexpected body: {body}");
    assert!(body.contains("bbox"));
}

#[tokio::test]
async fn test_missing_parameters_are_bad_requests() {
    let (_dir, dataset) = setup();

    let (status, _, body) = get(&dataset, "/features").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("bbox"));

    let (status, _, body) = get(&dataset, "/nearest?point=1,1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("radius"));

    let (status, _, _) = get(&dataset, "/nearest?point=1,1&radius=-2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let (_dir, dataset) = setup();
    let (status, _, body) = get(&dataset, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["features"], 5);
    assert_eq!(json["generation"], 1);
    assert_eq!(json["failed_reloads"], 0);
}

#[tokio::test]
async fn test_admin_reload() {
    let (dir, dataset) = setup();
    std::fs::write(
        dir.path().join("more.geojson"),
        r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.5, 1.5]}, "properties": {"name": "f"}}"#,
    )
    .unwrap();

    let request = Request::post("/admin/reload").body(Body::empty()).unwrap();
    let (status, _, body) = send(&dataset, request).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["features"], 6);
    assert_eq!(json["generation"], 2);

    let (_, _, body) = get(&dataset, "/features?bbox=0,0,2,2").await;
    assert_eq!(names(&body), vec!["f", "a", "b", "c"]);
}

#[tokio::test]
async fn test_failed_admin_reload_keeps_old_data() {
    let (dir, dataset) = setup();
    std::fs::write(dir.path().join("broken.geojson"), "{").unwrap();

    let request = Request::post("/admin/reload").body(Body::empty()).unwrap();
    let (status, _, body) = send(&dataset, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("broken.geojson"));

    let (status, _, body) = get(&dataset, "/features?bbox=0,0,2,2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["a", "b", "c"]);
}
