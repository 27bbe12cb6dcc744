//! Integration tests for the ecutune HTTP API.
//!
//! Uses axum-test against the full router and tempfile for the upload
//! directory.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use ecutune::api::{AppState, SESSION_HEADER, create_router};
use ecutune::config::ServerConfig;
use serde_json::{Value, json};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary upload directory.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Server with rate limiting disabled.
fn create_server(dir: &TempDir) -> TestServer {
    let config = ServerConfig::default()
        .with_upload_dir(dir.path())
        .with_rate_limit(0);
    TestServer::new(create_router(AppState::new(config))).unwrap()
}

fn session_header() -> HeaderName {
    HeaderName::from_static(SESSION_HEADER)
}

fn file_form(bytes: Vec<u8>, name: &str) -> MultipartForm {
    let part = Part::bytes(Bytes::from(bytes))
        .file_name(name.to_string())
        .mime_type("application/octet-stream");
    MultipartForm::new().add_part("file", part)
}

/// Upload a file, optionally into an existing session. Returns the body.
async fn upload(server: &TestServer, bytes: Vec<u8>, name: &str, session: Option<&str>) -> Value {
    let mut request = server.post("/api/upload").multipart(file_form(bytes, name));
    if let Some(id) = session {
        request = request.add_header(session_header(), HeaderValue::from_str(id).unwrap());
    }
    let response = request.await;
    assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
    response.json::<Value>()
}

fn one_megabyte() -> Vec<u8> {
    vec![0u8; 1_048_576]
}

// =============================================================================
// HEALTH AND STATUS
// =============================================================================

#[tokio::test]
async fn test_health_reports_healthy() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_root_banner() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("ecutune"));
}

#[tokio::test]
async fn test_status_without_session() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let body = server.get("/api/status").await.json::<Value>();
    assert_eq!(body["status"], "running");
    assert!(body["current_file"].is_null());
    assert_eq!(body["sessions"], 0);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_status_reports_session_file() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let uploaded = upload(&server, one_megabyte(), "golf.bin", None).await;
    let session_id = uploaded["session_id"].as_str().unwrap();

    let body = server
        .get("/api/status")
        .add_header(session_header(), HeaderValue::from_str(session_id).unwrap())
        .await
        .json::<Value>();
    assert_eq!(body["current_file"], "golf.bin");
    assert_eq!(body["sessions"], 1);
}

// =============================================================================
// UPLOAD
// =============================================================================

#[tokio::test]
async fn test_upload_detects_one_megabyte_file() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let body = upload(&server, one_megabyte(), "golf.bin", None).await;
    assert_eq!(body["success"], true);
    assert!(!body["session_id"].as_str().unwrap().is_empty());

    let info = &body["file_info"];
    assert_eq!(info["name"], "golf.bin");
    assert_eq!(info["size"], 1_048_576);
    assert_eq!(info["type"], "Generic ECU (1MB)");
    assert_eq!(info["checksum"].as_str().unwrap().len(), 16);
    assert_eq!(info["parameters"]["boost_pressure"]["value"], 1.2);
    assert_eq!(info["parameters"]["boost_pressure"]["unit"], "bar");
    assert_eq!(info["parameters"].as_object().unwrap().len(), 6);
}

#[tokio::test]
async fn test_upload_detects_vendor_token() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let mut bytes = vec![0u8; 4096];
    bytes[100..105].copy_from_slice(b"bosch");
    let body = upload(&server, bytes, "edc17.bin", None).await;
    assert_eq!(body["file_info"]["type"], "Bosch EDC17");
}

#[tokio::test]
async fn test_upload_stores_file_on_disk() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let body = upload(&server, vec![7u8; 300], "../escape.bin", None).await;
    let stored_as = body["stored_as"].as_str().unwrap();
    assert!(stored_as.ends_with("_escape.bin"));

    let stored = std::fs::read(temp.path().join(stored_as)).unwrap();
    assert_eq!(stored, vec![7u8; 300]);
    assert_eq!(body["file_info"]["name"], "escape.bin");
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = server.post("/api/upload").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "MISSING_FIELD");
}

#[tokio::test]
async fn test_upload_without_file_name() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let form = MultipartForm::new().add_part("file", Part::bytes(Bytes::from_static(b"data")));
    let response = server.post("/api/upload").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "NO_FILE_SELECTED");
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let temp = create_temp_dir();
    let mut config = ServerConfig::default()
        .with_upload_dir(temp.path())
        .with_rate_limit(0);
    config.max_upload_bytes = 1024;
    let server = TestServer::new(create_router(AppState::new(config))).unwrap();

    let response = server
        .post("/api/upload")
        .multipart(file_form(vec![0u8; 8192], "big.bin"))
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// PARAMETERS
// =============================================================================

#[tokio::test]
async fn test_parameters_before_upload() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let response = server.get("/api/parameters").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body = response.json::<Value>();
    assert_eq!(body["error"], "No ECU file loaded");
    assert_eq!(body["error_code"], "NO_FILE_LOADED");
}

#[tokio::test]
async fn test_parameters_after_upload() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let uploaded = upload(&server, one_megabyte(), "golf.bin", None).await;
    let session_id = uploaded["session_id"].as_str().unwrap();

    let response = server
        .get("/api/parameters")
        .add_header(session_header(), HeaderValue::from_str(session_id).unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    assert_eq!(body["boost_pressure"]["value"], 1.2);
    assert_eq!(body["fuel_pressure"]["value"], 1600);
    assert_eq!(body["speed_limiter"]["value"], 250);
    assert_eq!(body["egr_valve"]["unit"], "%");
}

// =============================================================================
// APPLY STAGE
// =============================================================================

#[tokio::test]
async fn test_apply_stage1() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let uploaded = upload(&server, one_megabyte(), "golf.bin", None).await;
    let session_id = uploaded["session_id"].as_str().unwrap();

    let response = server
        .post("/api/apply-stage")
        .add_header(session_header(), HeaderValue::from_str(session_id).unwrap())
        .json(&json!({"stage": "stage1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["stage"], "stage1");
    assert_eq!(body["parameters"]["boost_pressure"], 1.38);
    assert_eq!(body["parameters"]["fuel_pressure"], 1792);
    assert_eq!(body["parameters"]["injection_timing"], 8.9);
    assert_eq!(body["parameters"]["torque_limiter"], 480);
    assert_eq!(body["parameters"]["speed_limiter"], 0);
    assert_eq!(body["parameters"]["egr_valve"], 0);
}

#[tokio::test]
async fn test_apply_invalid_stage_leaves_parameters() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let uploaded = upload(&server, one_megabyte(), "golf.bin", None).await;
    let session_id = uploaded["session_id"].as_str().unwrap();
    let header = HeaderValue::from_str(session_id).unwrap();

    let response = server
        .post("/api/apply-stage")
        .add_header(session_header(), header.clone())
        .json(&json!({"stage": "stage9"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error_code"], "INVALID_STAGE");
    assert_eq!(body["error"], "Invalid stage: stage9");

    let params = server
        .get("/api/parameters")
        .add_header(session_header(), header)
        .await
        .json::<Value>();
    assert_eq!(params, uploaded["file_info"]["parameters"]);
}

#[tokio::test]
async fn test_apply_stage_before_upload() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let response = server
        .post("/api/apply-stage")
        .add_header(session_header(), HeaderValue::from_static("unknown-session"))
        .json(&json!({"stage": "stage1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "NO_FILE_LOADED");
}

#[tokio::test]
async fn test_apply_stage_without_stage_field() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let response = server.post("/api/apply-stage").json(&json!({})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body = response.json::<Value>();
    assert_eq!(body["error_code"], "MISSING_FIELD");
    assert_eq!(body["error"], "Stage not specified");

    let response = server.post("/api/apply-stage").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// SESSIONS
// =============================================================================

#[tokio::test]
async fn test_sessions_are_isolated() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let first = upload(&server, one_megabyte(), "one.bin", None).await;
    let second = upload(&server, vec![0u8; 524_288], "two.bin", None).await;
    let first_id = first["session_id"].as_str().unwrap();
    let second_id = second["session_id"].as_str().unwrap();
    assert_ne!(first_id, second_id);

    let status = server
        .get("/api/status")
        .add_header(session_header(), HeaderValue::from_str(first_id).unwrap())
        .await
        .json::<Value>();
    assert_eq!(status["current_file"], "one.bin");
    assert_eq!(status["sessions"], 2);
}

#[tokio::test]
async fn test_upload_into_existing_session_replaces_file() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let first = upload(&server, one_megabyte(), "one.bin", Some("workbench-1")).await;
    assert_eq!(first["session_id"], "workbench-1");
    let second = upload(&server, vec![0u8; 100], "two.bin", Some("workbench-1")).await;
    assert_eq!(second["session_id"], "workbench-1");

    let status = server
        .get("/api/status")
        .add_header(session_header(), HeaderValue::from_static("workbench-1"))
        .await
        .json::<Value>();
    assert_eq!(status["current_file"], "two.bin");
    assert_eq!(status["sessions"], 1);
}

#[tokio::test]
async fn test_session_count_stays_at_cap() {
    let temp = create_temp_dir();
    let config = ServerConfig::default()
        .with_upload_dir(temp.path())
        .with_rate_limit(0)
        .with_max_sessions(3);
    let server = TestServer::new(create_router(AppState::new(config))).unwrap();

    let mut ids = Vec::new();
    for _ in 0..10 {
        let body = upload(&server, vec![1u8; 64], "flood.bin", None).await;
        ids.push(body["session_id"].as_str().unwrap().to_string());
    }

    let status = server.get("/api/status").await.json::<Value>();
    assert_eq!(status["sessions"], 3);

    // The oldest session is gone, the newest is still served.
    let oldest = server
        .get("/api/parameters")
        .add_header(session_header(), HeaderValue::from_str(&ids[0]).unwrap())
        .await;
    assert_eq!(oldest.json::<Value>()["error_code"], "NO_FILE_LOADED");

    let newest = server
        .get("/api/parameters")
        .add_header(session_header(), HeaderValue::from_str(&ids[9]).unwrap())
        .await;
    assert_eq!(newest.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_same_name_uploads_keep_separate_files() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let first = upload(&server, vec![1u8; 32], "same.bin", None).await;
    let second = upload(&server, vec![2u8; 32], "same.bin", None).await;
    assert_ne!(first["stored_as"], second["stored_as"]);

    let stored = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(stored, 2);
}

#[tokio::test]
async fn test_oversized_session_header_rejected() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let long_id = "s".repeat(129);

    let response = server
        .post("/api/upload")
        .add_header(session_header(), HeaderValue::from_str(&long_id).unwrap())
        .multipart(file_form(one_megabyte(), "golf.bin"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "INVALID_SESSION_ID");

    let response = server
        .get("/api/parameters")
        .add_header(session_header(), HeaderValue::from_str(&long_id).unwrap())
        .await;
    assert_eq!(response.json::<Value>()["error_code"], "INVALID_SESSION_ID");

    let status = server.get("/api/status").await.json::<Value>();
    assert_eq!(status["sessions"], 0);
}

// =============================================================================
// EXPORT
// =============================================================================

#[tokio::test]
async fn test_export_before_upload() {
    let temp = create_temp_dir();
    let server = create_server(&temp);

    let response = server.post("/api/export").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "NO_FILE_LOADED");
}

#[tokio::test]
async fn test_export_returns_attachment() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let uploaded = upload(&server, one_megabyte(), "golf.bin", None).await;
    let session_id = uploaded["session_id"].as_str().unwrap();

    let response = server
        .post("/api/export")
        .add_header(session_header(), HeaderValue::from_str(session_id).unwrap())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let disposition = response.header("content-disposition");
    assert_eq!(
        disposition.to_str().unwrap(),
        "attachment; filename=\"golf_modified.bin\""
    );
    let text = response.text();
    assert!(text.starts_with("Modified ECU file - "));
    assert!(text.contains("source=golf.bin"));
    assert!(!text.contains("stage="));
}

#[tokio::test]
async fn test_export_with_stage() {
    let temp = create_temp_dir();
    let server = create_server(&temp);
    let uploaded = upload(&server, one_megabyte(), "golf.bin", None).await;
    let session_id = uploaded["session_id"].as_str().unwrap();
    let header = HeaderValue::from_str(session_id).unwrap();

    let response = server
        .post("/api/export")
        .add_header(session_header(), header.clone())
        .json(&json!({"stage": "stage1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("stage=stage1"));
    assert!(text.contains("boost_pressure=1.38"));

    let response = server
        .post("/api/export")
        .add_header(session_header(), header)
        .json(&json!({"stage": "stage0"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error_code"], "INVALID_STAGE");
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let temp = create_temp_dir();
    let config = ServerConfig::default()
        .with_upload_dir(temp.path())
        .with_rate_limit(1);
    let server = TestServer::new(create_router(AppState::new(config))).unwrap();

    let first = server.get("/health").await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let second = server.get("/health").await;
    assert_eq!(second.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.json::<Value>()["error_code"], "RATE_LIMITED");
}
