//! Error types for the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::services::UploadError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required request fields absent or empty (400)
    #[error("Missing required parameters")]
    MissingParameters,

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload could not be stored (500)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameters | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameters => "MISSING_PARAMETERS",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Io(_) => "IO_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::Io(e) => ApiError::Io(e),
            unsafe_name => ApiError::BadRequest(unsafe_name.to_string()),
        }
    }
}

/// HTTP status for a pipeline failure
///
/// The caller's input is at fault for a missing recording (404) or one that
/// is undecodable or too short to classify (422). Everything else is ours.
pub fn pipeline_status(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::SourceNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::NoChunksProduced { .. } | PipelineError::Decode(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
