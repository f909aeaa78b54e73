//! HTTP API integration tests
//!
//! Routes are exercised through `tower::ServiceExt::oneshot` against an
//! in-memory SQLite database and an in-memory blob store.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::*;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokwav_rp::codec::{CodecDecoder, CODEBOOK_DEPTH};
use tokwav_rp::config::{CliOverrides, ServiceConfig, TomlConfig};
use tokwav_rp::storage::BlobStore;
use tokwav_rp::{create_router, db, AppState};
use tower::ServiceExt;

const BOUNDARY: &str = "tokwav-test-boundary";

struct TestApp {
    router: Router,
    db: SqlitePool,
    store: Arc<RecordingBlobStore>,
}

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_tables(&pool).await.unwrap();
    pool
}

fn test_config() -> ServiceConfig {
    ServiceConfig::resolve(
        CliOverrides {
            root_folder: Some(PathBuf::from("/nonexistent/tokwav-test")),
            ..Default::default()
        },
        TomlConfig::default(),
    )
    .unwrap()
}

async fn test_app_with(decoder: Arc<dyn CodecDecoder>, store: Arc<RecordingBlobStore>) -> TestApp {
    let db = memory_pool().await;
    let state = AppState::new(db.clone(), decoder, store.clone(), test_config());
    TestApp {
        router: create_router(state),
        db,
        store,
    }
}

async fn test_app() -> TestApp {
    test_app_with(Arc::new(MarkerDecoder::new()), Arc::new(RecordingBlobStore::new())).await
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/recordings")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Two full batches of code 1 at 24 kHz
fn two_batch_bytes() -> Vec<u8> {
    batch_marker_payload(2, 75, 24_000).bytes().to_vec()
}

async fn upload(app: &TestApp, name: &str) -> (StatusCode, Value) {
    let bytes = two_batch_bytes();
    send(
        app,
        multipart_request(&[
            Part::File("tokens.bin", &bytes),
            Part::Text("format", "encodec"),
            Part::Text("sample_rate", "24000"),
            Part::Text("original_filename", name),
        ]),
    )
    .await
}

async fn recording_count(db: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM recordings")
        .fetch_one(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = send(&app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "tokwav-rp");
    assert_eq!(body["decoder"], "marker");
}

#[tokio::test]
async fn test_upload_stores_wav_and_records_metadata() {
    let app = test_app().await;

    let (status, body) = upload(&app, "take-1.webm").await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    assert_eq!(body["filename"], "take-1.webm");
    assert_eq!(body["sample_rate"], 22_050);
    assert_eq!(body["duration"], 2.0);
    assert!(body["id"].as_i64().is_some());
    assert!(body["created_at"].as_str().is_some());

    let path = body["original_path"].as_str().unwrap().to_string();
    assert!(path.starts_with("recordings/"));
    assert!(path.ends_with(".wav"));
    assert_eq!(app.store.puts(), vec![path.clone()]);

    let name = path.trim_start_matches("recordings/");
    let blob = app.store.get("recordings", name).unwrap().unwrap();
    assert_eq!(blob.content_type, "audio/wav");

    let (spec, samples) = read_wav(&blob.bytes);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(samples.len(), 44_100);
}

#[tokio::test]
async fn test_upload_defaults_rate_and_filename() {
    let app = test_app().await;
    let bytes = two_batch_bytes();

    let (status, body) = send(
        &app,
        multipart_request(&[
            Part::Text("format", "codec-v1"),
            Part::File("voice-note.bin", &bytes),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["filename"], "voice-note.bin");
    // Default source rate is 24 kHz: 150 frames * 320 samples -> 2 s
    assert_eq!(body["duration"], 2.0);
}

#[tokio::test]
async fn test_unsupported_format_is_bad_request() {
    let app = test_app().await;
    let bytes = two_batch_bytes();

    let (status, body) = send(
        &app,
        multipart_request(&[Part::File("a.bin", &bytes), Part::Text("format", "opus")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MALFORMED_INPUT");
    assert_eq!(body["error"]["stage"], "validating");
    assert!(app.store.puts().is_empty());
    assert_eq!(recording_count(&app.db).await, 0);
}

#[tokio::test]
async fn test_out_of_range_sample_rate_is_bad_request() {
    let decoder = Arc::new(MarkerDecoder::new());
    let app = test_app_with(decoder.clone(), Arc::new(RecordingBlobStore::new())).await;
    let bytes = two_batch_bytes();

    for rate in ["1", "7999", "192001", "4294967295"] {
        let (status, body) = send(
            &app,
            multipart_request(&[
                Part::File("a.bin", &bytes),
                Part::Text("format", "encodec"),
                Part::Text("sample_rate", rate),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "rate {}", rate);
        assert_eq!(body["error"]["code"], "MALFORMED_INPUT");
        assert_eq!(body["error"]["stage"], "validating");
    }

    assert_eq!(decoder.calls(), 0);
    assert!(app.store.puts().is_empty());
    assert_eq!(recording_count(&app.db).await, 0);
}

#[tokio::test]
async fn test_non_divisible_payload_is_bad_request() {
    let app = test_app().await;
    let bytes = vec![0u8; 4 * (CODEBOOK_DEPTH + 1)];

    let (status, body) = send(
        &app,
        multipart_request(&[Part::File("a.bin", &bytes), Part::Text("format", "encodec")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MALFORMED_INPUT");
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let app = test_app().await;

    let (status, body) = send(&app, multipart_request(&[Part::Text("format", "encodec")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let bytes = two_batch_bytes();
    let (status, _) = send(&app, multipart_request(&[Part::File("a.bin", &bytes)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        multipart_request(&[
            Part::File("a.bin", &bytes),
            Part::Text("format", "encodec"),
            Part::Text("sample_rate", "fast"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_decode_failure_reaches_neither_store() {
    let app = test_app_with(Arc::new(FailingDecoder::new(2)), Arc::new(RecordingBlobStore::new())).await;
    let bytes = batch_marker_payload(5, 75, 24_000).bytes().to_vec();

    let (status, body) = send(
        &app,
        multipart_request(&[Part::File("a.bin", &bytes), Part::Text("format", "encodec")]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "DECODE_ERROR");
    assert_eq!(body["error"]["stage"], "decoding");
    assert_eq!(body["error"]["batch"], 2);
    assert!(app.store.puts().is_empty());
    assert_eq!(recording_count(&app.db).await, 0);
}

#[tokio::test]
async fn test_storage_failure_records_nothing() {
    let app = test_app_with(Arc::new(MarkerDecoder::new()), Arc::new(RecordingBlobStore::failing())).await;

    let (status, body) = upload(&app, "a.webm").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "STORAGE_ERROR");
    assert_eq!(app.store.puts().len(), 1);
    assert_eq!(recording_count(&app.db).await, 0);
}

#[tokio::test]
async fn test_metadata_failure_removes_stored_blob() {
    let app = test_app().await;
    sqlx::query("DROP TABLE recordings").execute(&app.db).await.unwrap();

    let (status, body) = upload(&app, "a.webm").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "METADATA_ERROR");
    assert_eq!(app.store.puts().len(), 1);
    assert_eq!(app.store.deletes(), app.store.puts());
    assert_eq!(app.store.object_count(), 0);
}

#[tokio::test]
async fn test_list_paginates() {
    let app = test_app().await;
    for name in ["a", "b", "c"] {
        let (status, _) = upload(&app, name).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get_request("/recordings?page=1&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["filename"], "a");
    assert_eq!(body["metadata"]["page"], 1);
    assert_eq!(body["metadata"]["limit"], 2);
    assert_eq!(body["metadata"]["itemCount"], 3);
    assert_eq!(body["metadata"]["pageCount"], 2);

    let (_, body) = send(&app, get_request("/recordings?page=2&limit=2")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["filename"], "c");

    // Defaults: page 1, limit 20
    let (_, body) = send(&app, get_request("/recordings")).await;
    assert_eq!(body["metadata"]["limit"], 20);
    assert_eq!(body["metadata"]["pageCount"], 1);
}

#[tokio::test]
async fn test_list_rejects_zero_page() {
    let app = test_app().await;
    let (status, body) = send(&app, get_request("/recordings?page=0")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_get_recording_by_id() {
    let app = test_app().await;
    let (_, created) = upload(&app, "one").await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(&app, get_request(&format!("/recordings/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);

    let (status, body) = send(&app, get_request("/recordings/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
