//! HTTP surface tests driven through the router with `oneshot`

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use helpers::{tone_wav_bytes, FixedClassifier, ToneConfig};
use tunetag_classify::audio::FileWaveformSource;
use tunetag_classify::classifier::GenreLabels;
use tunetag_classify::config::ServiceConfig;
use tunetag_classify::pipeline::{BlockingPool, Pipeline, TargetShape};
use tunetag_classify::services::UploadStore;
use tunetag_classify::{build_router, AppState};

struct TestApp {
    router: Router,
    uploads: TempDir,
    classifier: Arc<FixedClassifier>,
}

fn test_app() -> TestApp {
    let uploads = TempDir::new().unwrap();
    let classifier = Arc::new(FixedClassifier::new(1));
    let pipeline = Pipeline::new(
        Arc::new(FileWaveformSource::default()),
        classifier.clone(),
        GenreLabels::default(),
    )
    .with_target_shape(TargetShape::new(32, 32))
    .with_pool(BlockingPool::new(2));

    let config = ServiceConfig {
        uploads_dir: uploads.path().to_path_buf(),
        ..Default::default()
    };
    let state = AppState::new(Arc::new(pipeline), UploadStore::new(config.resolved_uploads_dir()));
    let router = build_router(state, &config).unwrap();

    TestApp {
        router,
        uploads,
        classifier,
    }
}

fn encoded_tone(seconds: f64) -> String {
    let bytes = tone_wav_bytes(&ToneConfig {
        duration_seconds: seconds,
        ..Default::default()
    })
    .unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Stored copies of `filename` across all request directories
fn stored_uploads(dir: &Path, filename: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path().join(filename))
        .filter(|path| path.exists())
        .collect()
}

async fn post_process(router: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/process")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_valid_upload_returns_label_and_bucket() {
    let app = test_app();

    let (status, body) = post_process(
        app.router,
        json!({
            "filename": "tone.wav",
            "content_type": "audio/wav",
            "audio_data": encoded_tone(10.0),
            "start": 0,
            "end": 10
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "40secs");
    assert_eq!(body["output"], "jazz");
    assert!(body.get("error").is_none());
    assert_eq!(stored_uploads(app.uploads.path(), "tone.wav").len(), 1);
    assert_eq!(app.classifier.maps_seen(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_with_same_filename_stay_isolated() {
    let app = test_app();
    let long_clip = encoded_tone(10.0);
    let short_clip = encoded_tone(1.0);

    let requests = (0..16).map(|i| {
        let router = app.router.clone();
        let long = i % 2 == 0;
        let audio = if long { long_clip.clone() } else { short_clip.clone() };
        tokio::spawn(async move {
            let response = post_process(
                router,
                json!({
                    "filename": "same.wav",
                    "content_type": "audio/wav",
                    "audio_data": audio,
                    "start": 0,
                    "end": 10
                }),
            )
            .await;
            (long, response)
        })
    });

    for request in requests.collect::<Vec<_>>() {
        let (long, (status, body)) = request.await.unwrap();
        if long {
            assert_eq!(status, StatusCode::OK, "10s upload: {}", body);
            assert_eq!(body["output"], "jazz");
        } else {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "1s upload: {}", body);
            assert_eq!(body["error"]["code"], "NO_CHUNKS_PRODUCED");
        }
    }
    assert_eq!(stored_uploads(app.uploads.path(), "same.wav").len(), 16);
    assert_eq!(app.classifier.maps_seen(), 8 * 4);
}

#[tokio::test]
async fn test_missing_parameters_is_400() {
    let app = test_app();

    let (status, body) = post_process(
        app.router,
        json!({ "filename": "tone.wav", "start": 0, "end": 10 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_PARAMETERS");
    assert_eq!(body["error"]["message"], "Missing required parameters");
    assert_eq!(app.classifier.calls(), 0);
}

#[tokio::test]
async fn test_invalid_base64_is_400() {
    let app = test_app();

    let (status, body) = post_process(
        app.router,
        json!({
            "filename": "tone.wav",
            "content_type": "audio/wav",
            "audio_data": "%%%not-base64%%%"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_path_traversal_filename_is_400() {
    let app = test_app();

    let (status, _) = post_process(
        app.router,
        json!({
            "filename": "../escape.wav",
            "content_type": "audio/wav",
            "audio_data": encoded_tone(1.0)
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!app.uploads.path().join("../escape.wav").exists());
}

#[tokio::test]
async fn test_short_window_is_422_with_bucket() {
    let app = test_app();

    let (status, body) = post_process(
        app.router,
        json!({
            "filename": "tone.wav",
            "content_type": "audio/wav",
            "audio_data": encoded_tone(10.0),
            "start": 1,
            "end": 3
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "40secs");
    assert_eq!(body["output"], Value::Null);
    assert_eq!(body["error"]["code"], "NO_CHUNKS_PRODUCED");
    assert_eq!(app.classifier.calls(), 0);
}

#[tokio::test]
async fn test_bucket_follows_requested_window() {
    let app = test_app();

    // Window runs past the 10s recording; bucket comes from end - start
    let (status, body) = post_process(
        app.router,
        json!({
            "filename": "tone.wav",
            "content_type": "audio/wav",
            "audio_data": encoded_tone(10.0),
            "start": "0",
            "end": "100"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "exceeds allowed range");
    assert_eq!(body["output"], "jazz");
}

#[tokio::test]
async fn test_undecodable_upload_is_422() {
    let app = test_app();

    let (status, body) = post_process(
        app.router,
        json!({
            "filename": "junk.wav",
            "content_type": "audio/wav",
            "audio_data": base64::engine::general_purpose::STANDARD.encode(b"not audio"),
            "end": 10
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "DECODE_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/process")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tunetag-classify");
    assert_eq!(body["labels"], json!(["classical", "jazz", "pop", "rock"]));

    assert!(!body["git_hash"].as_str().unwrap().is_empty());
    let built = body["build_timestamp"].as_str().unwrap();
    assert!(built.ends_with('Z'), "build timestamp not UTC: {}", built);
    chrono::DateTime::parse_from_rfc3339(built).unwrap();
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let app = test_app();
    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/process")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app
        .router
        .clone()
        .oneshot(preflight("http://127.0.0.1:8000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://127.0.0.1:8000"
    );

    // The configured origin is always echoed; the browser rejects the mismatch
    let denied = app.router.oneshot(preflight("http://evil.example")).await.unwrap();
    assert_eq!(
        denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://127.0.0.1:8000"
    );
}
