//! Request and response bodies.

use ecutune_core::{LoadedFile, Stage, StagedValues};
use serde::{Deserialize, Serialize};

/// `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /api/status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Name of the caller's current file, if any.
    pub current_file: Option<String>,
    /// Number of live sessions.
    pub sessions: usize,
    pub uptime_seconds: u64,
}

/// `POST /api/upload`
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub session_id: String,
    /// File name under the upload directory.
    pub stored_as: String,
    pub file_info: LoadedFile,
}

/// `POST /api/apply-stage` request.
#[derive(Debug, Default, Deserialize)]
pub struct StageRequest {
    pub stage: Option<String>,
}

/// `POST /api/apply-stage` response.
#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub success: bool,
    pub stage: Stage,
    pub parameters: StagedValues,
}

/// `POST /api/export` request. The body is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    pub stage: Option<String>,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}
