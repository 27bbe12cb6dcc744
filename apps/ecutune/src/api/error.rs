//! API error type and its JSON rendering.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ecutune_core::EcuError;
use thiserror::Error;

use super::types::ErrorResponse;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Not loaded / invalid stage, from the core.
    #[error(transparent)]
    Ecu(#[from] EcuError),

    /// A required request field was absent or empty.
    #[error("{0} not specified")]
    MissingField(&'static str),

    /// The session header was present but unusable.
    #[error("Invalid session id: expected at most {max} visible ASCII characters")]
    InvalidSessionId { max: usize },

    /// The `file` part was present but had no file name.
    #[error("No file selected")]
    NoFileSelected,

    /// The multipart body could not be read.
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// The rate limiter rejected the request.
    #[error("Too many requests")]
    RateLimited,

    /// Writing the upload to disk failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ecu(_)
            | Self::MissingField(_)
            | Self::InvalidSessionId { .. }
            | Self::NoFileSelected => StatusCode::BAD_REQUEST,
            Self::Multipart(err) => err.status(),
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ecu(EcuError::NotLoaded) => "NO_FILE_LOADED",
            Self::Ecu(EcuError::InvalidStage(_)) => "INVALID_STAGE",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidSessionId { .. } => "INVALID_SESSION_ID",
            Self::NoFileSelected => "NO_FILE_SELECTED",
            Self::Multipart(_) => "INVALID_MULTIPART",
            Self::RateLimited => "RATE_LIMITED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = self.code(), "Request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
