//! HTTP handlers.
//!
//! Every handler that touches a file resolves the caller's session from the
//! `x-session-id` header. A missing or unknown session behaves exactly like
//! a session with nothing loaded. A header that is too long or not visible
//! ASCII is rejected rather than ignored.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use ecutune_core::{
    EcuError, ParameterSet, Session, Stage, apply_preset, apply_stage as stage_parameters,
    export_file_name, render_export,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use super::sessions::SessionStore;
use super::types::{
    ExportRequest, HealthResponse, StageRequest, StageResponse, StatusResponse, UploadResponse,
};

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Longest accepted session id.
const MAX_SESSION_ID_LEN: usize = 128;

// =============================================================================
// HELPERS
// =============================================================================

/// Session id from the request headers.
///
/// An absent or blank header is `None`. A header longer than the limit or
/// holding anything other than visible ASCII is an error.
pub fn session_id(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let invalid = || ApiError::InvalidSessionId {
        max: MAX_SESSION_ID_LEN,
    };
    let id = value.to_str().map_err(|_| invalid())?.trim();
    if id.is_empty() {
        return Ok(None);
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(invalid());
    }
    Ok(Some(id.to_string()))
}

fn lookup<'a>(sessions: &'a SessionStore, id: Option<&str>) -> Option<&'a Session> {
    id.and_then(|id| sessions.get(id))
}

/// On-disk name for an upload: timestamp, random tag, sanitized name.
fn stored_file_name(name: &str) -> String {
    format!(
        "{}_{:08x}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        Uuid::new_v4().as_fields().0,
        name
    )
}

/// Strip any directory part from a client-supplied file name.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}

/// `Content-Disposition` value with a header-safe file name.
pub fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

fn requested_stage(stage: Option<String>) -> Option<String> {
    stage
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /`
pub async fn root() -> &'static str {
    "ecutune ECU parameter service"
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `GET /api/status`
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = session_id(&headers)?;
    let session_count = state.session_count().await;
    let current_file = {
        let sessions = state.sessions.read().await;
        lookup(&sessions, id.as_deref())
            .and_then(Session::current_file)
            .map(|file| file.name.clone())
    };

    Ok(Json(StatusResponse {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        current_file,
        sessions: session_count,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// `POST /api/upload`
///
/// Stores the `file` part under the upload directory and loads it into the
/// caller's session, creating a session when the request names none.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let requested_id = session_id(&headers)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((raw_name, bytes));
        break;
    }

    let (raw_name, bytes) = upload.ok_or(ApiError::MissingField("File"))?;
    let name = sanitize_file_name(&raw_name).ok_or(ApiError::NoFileSelected)?;

    let stored_as = stored_file_name(&name);
    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir).await?;
    tokio::fs::write(upload_dir.join(&stored_as), &bytes).await?;

    let session_id = requested_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let (file_info, evicted) = {
        let mut sessions = state.sessions.write().await;
        let (file, evicted) = sessions.load(&session_id, &bytes, name);
        (file.clone(), evicted)
    };
    if let Some(evicted) = evicted {
        debug!(session_id = %evicted, "Session evicted to stay within max_sessions");
    }

    info!(
        session_id = %session_id,
        stored_as = %stored_as,
        size = file_info.size,
        ecu_type = %file_info.ecu_type,
        checksum = %file_info.checksum,
        "ECU file uploaded and processed"
    );

    Ok(Json(UploadResponse {
        success: true,
        session_id,
        stored_as,
        file_info,
    }))
}

/// `GET /api/parameters`
pub async fn parameters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ParameterSet>, ApiError> {
    let id = session_id(&headers)?;
    let sessions = state.sessions.read().await;
    let session = lookup(&sessions, id.as_deref()).ok_or(EcuError::NotLoaded)?;
    Ok(Json(session.current_parameters()?.clone()))
}

/// `POST /api/apply-stage`
pub async fn apply_stage(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<StageRequest>>,
) -> Result<Json<StageResponse>, ApiError> {
    let id = session_id(&headers)?;
    let stage_name = requested_stage(body.and_then(|Json(request)| request.stage))
        .ok_or(ApiError::MissingField("Stage"))?;

    let sessions = state.sessions.read().await;
    let current = lookup(&sessions, id.as_deref())
        .and_then(Session::current_file)
        .map(|file| &file.parameters);
    let parameters = stage_parameters(current, &stage_name)?;
    let stage = stage_name.parse::<Stage>()?;

    info!(
        session_id = ?id,
        stage = %stage,
        "Applied stage tuning"
    );

    Ok(Json(StageResponse {
        success: true,
        stage,
        parameters,
    }))
}

/// `POST /api/export`
///
/// Returns the placeholder export as an attachment. An optional `stage` in
/// the body adds the staged values to the output.
pub async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<ExportRequest>>,
) -> Result<Response, ApiError> {
    let id = session_id(&headers)?;
    let requested = requested_stage(body.and_then(|Json(request)| request.stage));

    let sessions = state.sessions.read().await;
    let file = lookup(&sessions, id.as_deref())
        .and_then(Session::current_file)
        .ok_or(EcuError::NotLoaded)?;

    let staged = match requested {
        Some(name) => {
            let stage = name.parse::<Stage>()?;
            Some((stage, apply_preset(&file.parameters, stage)))
        }
        None => None,
    };

    let content = render_export(
        file,
        staged.as_ref().map(|(stage, values)| (*stage, values)),
        &Utc::now().to_rfc3339(),
    );
    let download_name = export_file_name(&file.name);

    info!(
        session_id = ?id,
        file = %download_name,
        stage = ?staged.as_ref().map(|(stage, _)| stage.as_str()),
        "ECU file exported"
    );

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, content_disposition(&download_name)),
        ],
        content,
    )
        .into_response())
}

// =============================================================================
// TESTS
// =============================================================================
