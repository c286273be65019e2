// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! End-to-end tests for the HTTP API with a substituted keypoint provider.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat};
use pose_measure::server::{AppState, ModelInfo, router};
use pose_measure::{
    BodyPart, Keypoint, KeypointProvider, KeypointSet, PersonSelection, PoseDetection, Result,
    ServerConfig,
};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "pose-measure-test-boundary";

/// Provider returning fixed detections, counting calls, optionally slow.
#[derive(Clone)]
struct FakeProvider {
    detections: Vec<PoseDetection>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn new(detections: Vec<PoseDetection>) -> Self {
        Self {
            detections,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl KeypointProvider for FakeProvider {
    fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<PoseDetection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(self.detections.clone())
    }
}

/// Front-facing person: 40px shoulders, 30px hips, 200px shoulder-to-ankle span.
fn reference_person(confidence: f32) -> PoseDetection {
    let mut coords = vec![(120.0, 20.0); 17];
    coords[BodyPart::LeftShoulder.index()] = (100.0, 50.0);
    coords[BodyPart::RightShoulder.index()] = (140.0, 50.0);
    coords[BodyPart::LeftElbow.index()] = (90.0, 100.0);
    coords[BodyPart::RightElbow.index()] = (150.0, 100.0);
    coords[BodyPart::LeftWrist.index()] = (90.0, 150.0);
    coords[BodyPart::RightWrist.index()] = (150.0, 150.0);
    coords[BodyPart::LeftHip.index()] = (105.0, 150.0);
    coords[BodyPart::RightHip.index()] = (135.0, 150.0);
    coords[BodyPart::LeftKnee.index()] = (105.0, 200.0);
    coords[BodyPart::RightKnee.index()] = (135.0, 200.0);
    coords[BodyPart::LeftAnkle.index()] = (100.0, 250.0);
    coords[BodyPart::RightAnkle.index()] = (140.0, 250.0);

    PoseDetection {
        bbox: [80.0, 10.0, 160.0, 260.0],
        confidence,
        keypoints: KeypointSet::from_xy(&coords),
    }
}

fn partial_person(confidence: f32, num_points: usize) -> PoseDetection {
    PoseDetection {
        bbox: [0.0, 0.0, 50.0, 50.0],
        confidence,
        keypoints: KeypointSet::new(vec![Keypoint::new(10.0, 10.0); num_points]),
    }
}

fn temp_upload_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pose-measure-api-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::new_rgb8(16, 32)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn model_info() -> ModelInfo {
    ModelInfo {
        description: "fake pose provider".to_string(),
        imgsz: (640, 640),
        kpt_shape: (17, 3),
    }
}

fn app(provider: FakeProvider, config: ServerConfig) -> Router {
    router(AppState::new(Box::new(provider), model_info(), config)).unwrap()
}

/// Build a multipart body from optional `height` and `image` fields.
fn multipart_body(height: Option<&str>, image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(height) = height {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"height\"\r\n\r\n{height}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_analyze(app: Router, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze-pose")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_analyze_pose_success() {
    let dir = temp_upload_dir();
    let provider = FakeProvider::new(vec![reference_person(0.9)]);
    let calls = Arc::clone(&provider.calls);
    let app = app(provider, ServerConfig::default().with_upload_dir(&dir));

    let png = png_bytes();
    let (status, json) = post_analyze(app, multipart_body(Some("180"), Some(("me.png", &png)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Analysis successful");
    let m = &json["measurements"];
    for key in [
        "shoulder_width",
        "waist_width",
        "arm_length",
        "leg_length",
        "estimated_chest_circumference",
        "estimated_waist_circumference",
    ] {
        assert!(m[key].as_f64().unwrap() > 0.0, "{key} should be positive");
    }
    assert!((m["shoulder_width"].as_f64().unwrap() - 28.8).abs() < 1e-9);
    assert!((m["waist_width"].as_f64().unwrap() - 21.6).abs() < 1e-9);
    assert!((m["estimated_waist_circumference"].as_f64().unwrap() - 67.9).abs() < 1e-9);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_no_person() {
    let dir = temp_upload_dir();
    let app = app(FakeProvider::new(Vec::new()), ServerConfig::default().with_upload_dir(&dir));

    let png = png_bytes();
    let (status, json) = post_analyze(app, multipart_body(Some("170"), Some(("me.jpg", &png)))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "No person detected in the image");
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_invalid_height_skips_detection() {
    let dir = temp_upload_dir();
    let provider = FakeProvider::new(vec![reference_person(0.9)]);
    let calls = Arc::clone(&provider.calls);
    let app = app(provider, ServerConfig::default().with_upload_dir(&dir));

    let png = png_bytes();
    let (status, json) = post_analyze(app, multipart_body(Some("abc"), Some(("me.png", &png)))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().starts_with("Invalid height"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_rejects_non_positive_and_missing_height() {
    let dir = temp_upload_dir();
    let provider = FakeProvider::new(vec![reference_person(0.9)]);
    let config = ServerConfig::default().with_upload_dir(&dir);
    let png = png_bytes();

    for height in [Some("0"), Some("-175"), None] {
        let app = app(provider.clone(), config.clone());
        let (status, _) = post_analyze(app, multipart_body(height, Some(("me.png", &png)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "height {height:?}");
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_missing_image() {
    let dir = temp_upload_dir();
    let app = app(
        FakeProvider::new(vec![reference_person(0.9)]),
        ServerConfig::default().with_upload_dir(&dir),
    );

    let (status, json) = post_analyze(app, multipart_body(Some("170"), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Missing 'image' field");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_undecodable_image() {
    let dir = temp_upload_dir();
    let provider = FakeProvider::new(vec![reference_person(0.9)]);
    let calls = Arc::clone(&provider.calls);
    let app = app(provider, ServerConfig::default().with_upload_dir(&dir));

    let (status, json) = post_analyze(
        app,
        multipart_body(Some("170"), Some(("me.jpg", b"definitely not an image"))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().starts_with("Invalid image"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_incomplete_detection() {
    let dir = temp_upload_dir();
    let app = app(
        FakeProvider::new(vec![partial_person(0.9, 12)]),
        ServerConfig::default().with_upload_dir(&dir),
    );

    let png = png_bytes();
    let (status, json) = post_analyze(app, multipart_body(Some("170"), Some(("me.png", &png)))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["detail"],
        "Incomplete pose detection: 12 keypoints found, 17 required"
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_person_selection_policy() {
    let dir = temp_upload_dir();
    // The most confident detection is a partial one
    let people = vec![reference_person(0.5), partial_person(0.9, 10)];
    let png = png_bytes();

    let default_app = app(
        FakeProvider::new(people.clone()),
        ServerConfig::default().with_upload_dir(&dir),
    );
    let (status, _) =
        post_analyze(default_app, multipart_body(Some("180"), Some(("me.png", &png)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let first_app = app(
        FakeProvider::new(people),
        ServerConfig::default()
            .with_upload_dir(&dir)
            .with_person_selection(PersonSelection::First),
    );
    let (status, json) =
        post_analyze(first_app, multipart_body(Some("180"), Some(("me.png", &png)))).await;
    assert_eq!(status, StatusCode::OK);
    assert!((json["measurements"]["shoulder_width"].as_f64().unwrap() - 28.8).abs() < 1e-9);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_timeout() {
    let dir = temp_upload_dir();
    let provider = FakeProvider::new(vec![reference_person(0.9)]).slow(Duration::from_millis(300));
    let app = app(
        provider,
        ServerConfig::default()
            .with_upload_dir(&dir)
            .with_detection_timeout(Duration::from_millis(50)),
    );

    let png = png_bytes();
    let (status, json) = post_analyze(app, multipart_body(Some("170"), Some(("me.png", &png)))).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json["detail"].as_str().unwrap().contains("timed out"));
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_queued_request_times_out_waiting_for_permit() {
    let dir = temp_upload_dir();
    let provider = FakeProvider::new(vec![reference_person(0.9)]).slow(Duration::from_millis(300));
    let app = app(
        provider,
        ServerConfig::default()
            .with_upload_dir(&dir)
            .with_max_concurrent_detections(1)
            .with_detection_timeout(Duration::from_millis(450)),
    );

    // One detection fits in the budget; the second must queue behind it.
    let png = png_bytes();
    let ((first, _), (second, _)) = tokio::join!(
        post_analyze(app.clone(), multipart_body(Some("180"), Some(("a.png", &png)))),
        post_analyze(app, multipart_body(Some("180"), Some(("b.png", &png)))),
    );

    let mut statuses = [first, second];
    statuses.sort_by_key(StatusCode::as_u16);
    assert_eq!(statuses, [StatusCode::OK, StatusCode::GATEWAY_TIMEOUT]);
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_analyze_pose_payload_too_large() {
    let dir = temp_upload_dir();
    let app = app(
        FakeProvider::new(vec![reference_person(0.9)]),
        ServerConfig::default()
            .with_upload_dir(&dir)
            .with_max_upload_bytes(1024),
    );

    let big = vec![0u8; 8 * 1024];
    let (status, _) = post_analyze(app, multipart_body(Some("170"), Some(("big.png", &big)))).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(dir_is_empty(&dir));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_health_and_info() {
    let app = app(
        FakeProvider::new(Vec::new()),
        ServerConfig::default().with_person_selection(PersonSelection::LargestBox),
    );

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "pose-measure");

    let response = app
        .oneshot(Request::builder().uri("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["task"], "pose");
    assert_eq!(json["person_selection"], "largest-box");
    assert!((json["calibration"]["body_height_ratio"].as_f64().unwrap() - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_cors_allows_only_configured_origin() {
    let app = app(FakeProvider::new(Vec::new()), ServerConfig::default());

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/analyze-pose")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight("http://localhost:3000")).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");

    let response = app.oneshot(preflight("http://evil.example.com")).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
