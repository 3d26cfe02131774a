//! API integration tests.
//!
//! These run against the real router with an offline object store: client
//! construction does no I/O, and every request here terminates before a
//! storage call could happen.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use vodmill_media::{TranscodeSettings, Transcoder};
use vodmill_models::{PushEnvelope, PushMessage, VideoUploadPayload};
use vodmill_server::{create_router, AppState, ServiceConfig, StageConfig, StageStore};
use vodmill_storage::{ObjectStore, StorageConfig};

struct TestHarness {
    app: axum::Router,
    raw_dir: std::path::PathBuf,
    processed_dir: std::path::PathBuf,
    _tmp: tempfile::TempDir,
}

async fn harness() -> TestHarness {
    let tmp = tempfile::tempdir().unwrap();

    let stage_config = StageConfig {
        raw_dir: tmp.path().join("raw-videos"),
        processed_dir: tmp.path().join("processed-videos"),
    };
    let stage = StageStore::new(&stage_config);
    stage.ensure_directories().await.unwrap();

    let store = ObjectStore::new(StorageConfig {
        endpoint_url: Some("http://127.0.0.1:9000".to_string()),
        region: "auto".to_string(),
        access_key_id: "test-access-key".to_string(),
        secret_access_key: "test-secret-key".to_string(),
        raw_bucket: "vodmill-raw-videos".to_string(),
        processed_bucket: "vodmill-processed-videos".to_string(),
        force_path_style: true,
    })
    .await
    .unwrap();

    let config = ServiceConfig {
        stage: stage_config.clone(),
        ..ServiceConfig::default()
    };

    let state = AppState::from_parts(
        config,
        stage,
        Arc::new(store),
        Arc::new(Transcoder::new(TranscodeSettings::default())),
    );

    TestHarness {
        app: create_router(state, None),
        raw_dir: stage_config.raw_dir,
        processed_dir: stage_config.processed_dir,
        _tmp: tmp,
    }
}

fn post_notification(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-video")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn envelope_for(name: Option<&str>) -> String {
    let payload = VideoUploadPayload {
        name: name.map(str::to_string),
    };
    let envelope = PushEnvelope::from_message(PushMessage::with_payload(&payload));
    serde_json::to_string(&envelope).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_header_is_set() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("X-Request-ID"));
}

#[tokio::test]
async fn test_metrics_endpoint_absent_when_disabled() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_envelope_without_message_is_rejected() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification("{}".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "validation_error");

    // Rejected before anything was staged.
    assert!(dir_is_empty(&h.raw_dir));
    assert!(dir_is_empty(&h.processed_dir));
}

#[tokio::test]
async fn test_payload_without_name_is_rejected() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification(envelope_for(None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "validation_error");
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("missing the video name"));

    assert!(dir_is_empty(&h.raw_dir));
    assert!(dir_is_empty(&h.processed_dir));
}

#[tokio::test]
async fn test_invalid_base64_is_rejected() {
    let h = harness().await;

    let body = serde_json::json!({
        "message": { "data": "!!!not-base64!!!" }
    })
    .to_string();

    let response = h
        .app
        .clone()
        .oneshot(post_notification(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "validation_error");
}

#[tokio::test]
async fn test_path_traversal_name_is_rejected() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification(envelope_for(Some("../../etc/passwd"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "validation_error");

    assert!(dir_is_empty(&h.raw_dir));
    assert!(dir_is_empty(&h.processed_dir));
}

#[tokio::test]
async fn test_malformed_json_body_is_rejected() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification("this is not json".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "validation_error");
}
