//! End-to-end pipeline tests.
//!
//! Drive the real router against a mock object store and a stub engine
//! binary, then assert on the remote calls made and the staged files left
//! behind. Stub engines are shell scripts, so this file is Unix-only.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use vodmill_media::{TranscodeSettings, Transcoder};
use vodmill_models::{PushEnvelope, PushMessage, VideoUploadPayload};
use vodmill_server::{create_router, AppState, ServiceConfig, StageConfig, StageStore};
use vodmill_storage::{ObjectStore, StorageConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RAW_BUCKET: &str = "vodmill-raw-videos";
const PROCESSED_BUCKET: &str = "vodmill-processed-videos";

/// Engine stub that writes its last argument (the output path) and exits 0.
const PASSING_ENGINE: &str = "#!/bin/sh\nfor out do :; done\nprintf 'transcoded' > \"$out\"\n";

/// Engine stub that fails the way the real engine does on corrupt input.
const FAILING_ENGINE: &str =
    "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n";

const NO_SUCH_KEY_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>";

fn write_stub_engine(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

struct TestHarness {
    app: axum::Router,
    raw_dir: PathBuf,
    processed_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

async fn harness(server: &MockServer, engine_script: &str) -> TestHarness {
    let tmp = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(tmp.path(), engine_script);

    let stage_config = StageConfig {
        raw_dir: tmp.path().join("raw-videos"),
        processed_dir: tmp.path().join("processed-videos"),
    };
    let stage = StageStore::new(&stage_config);
    stage.ensure_directories().await.unwrap();

    let store = ObjectStore::new(StorageConfig {
        endpoint_url: Some(server.uri()),
        region: "auto".to_string(),
        access_key_id: "test-access-key".to_string(),
        secret_access_key: "test-secret-key".to_string(),
        raw_bucket: RAW_BUCKET.to_string(),
        processed_bucket: PROCESSED_BUCKET.to_string(),
        force_path_style: true,
    })
    .await
    .unwrap();

    let transcoder = Transcoder::new(TranscodeSettings {
        engine_bin: engine,
        ..TranscodeSettings::default()
    });

    let config = ServiceConfig {
        stage: stage_config.clone(),
        ..ServiceConfig::default()
    };

    let state = AppState::from_parts(config, stage, Arc::new(store), Arc::new(transcoder));

    TestHarness {
        app: create_router(state, None),
        raw_dir: stage_config.raw_dir,
        processed_dir: stage_config.processed_dir,
        _tmp: tmp,
    }
}

fn envelope_for(name: &str) -> String {
    let payload = VideoUploadPayload {
        name: Some(name.to_string()),
    };
    let envelope = PushEnvelope::from_message(PushMessage::with_payload(&payload));
    serde_json::to_string(&envelope).unwrap()
}

fn post_notification(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-video")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_successful_job_publishes_and_cleans_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}/clip.mp4", RAW_BUCKET)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw video bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    // Upload, then the public-read policy call: two PUTs to the processed key.
    Mock::given(method("PUT"))
        .and(path(format!("/{}/processed-clip.mp4", PROCESSED_BUCKET)))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let h = harness(&server, PASSING_ENGINE).await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification(envelope_for("clip.mp4")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "success");
    assert_eq!(body["video"], "clip.mp4");
    assert_eq!(body["processed_key"], "processed-clip.mp4");

    // Both staged files are gone.
    assert!(!h.raw_dir.join("clip.mp4").exists());
    assert!(!h.processed_dir.join("processed-clip.mp4").exists());
}

#[tokio::test]
async fn test_missing_raw_object_fails_without_leftovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}/missing.mp4", RAW_BUCKET)))
        .respond_with(ResponseTemplate::new(404).set_body_raw(NO_SUCH_KEY_XML, "application/xml"))
        .mount(&server)
        .await;

    // A job that never staged its input must not touch the processed bucket.
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, PASSING_ENGINE).await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification(envelope_for("missing.mp4")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "download_error");
    assert_eq!(body["detail"], "An internal error occurred");

    assert!(!h.raw_dir.join("missing.mp4").exists());
    assert!(!h.processed_dir.join("processed-missing.mp4").exists());
}

#[tokio::test]
async fn test_transcode_failure_cleans_up_and_uploads_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}/clip.mp4", RAW_BUCKET)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw video bytes".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, FAILING_ENGINE).await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification(envelope_for("clip.mp4")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "transcode_error");
    assert_eq!(body["detail"], "An internal error occurred");

    // The staged download is removed even though the job died mid-pipeline.
    assert!(!h.raw_dir.join("clip.mp4").exists());
    assert!(!h.processed_dir.join("processed-clip.mp4").exists());
}

#[tokio::test]
async fn test_upload_failure_still_cleans_both_staged_files() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}/clip.mp4", RAW_BUCKET)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw video bytes".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let h = harness(&server, PASSING_ENGINE).await;

    let response = h
        .app
        .clone()
        .oneshot(post_notification(envelope_for("clip.mp4")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "upload_error");

    // The transcoded output existed locally when the upload failed; both
    // staged files must still be deleted.
    assert!(!h.raw_dir.join("clip.mp4").exists());
    assert!(!h.processed_dir.join("processed-clip.mp4").exists());
}

#[tokio::test]
async fn test_concurrent_jobs_do_not_interfere() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw video bytes".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(4)
        .mount(&server)
        .await;

    let h = harness(&server, PASSING_ENGINE).await;

    let (first, second) = tokio::join!(
        h.app
            .clone()
            .oneshot(post_notification(envelope_for("first.mp4"))),
        h.app
            .clone()
            .oneshot(post_notification(envelope_for("second.mp4"))),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    assert_eq!(body_json(first).await["processed_key"], "processed-first.mp4");
    assert_eq!(
        body_json(second).await["processed_key"],
        "processed-second.mp4"
    );

    for name in ["first.mp4", "second.mp4"] {
        assert!(!h.raw_dir.join(name).exists());
        assert!(!h.processed_dir.join(format!("processed-{name}")).exists());
    }
}
