//! POST /process payloads

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::pipeline::{DurationBucket, PipelineError};

/// Window offset in seconds, sent either as a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Seconds {
    Number(f64),
    Text(String),
}

impl Seconds {
    fn value(&self, field: &str) -> Result<f64, ApiError> {
        let value = match self {
            Seconds::Number(n) => *n,
            Seconds::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ApiError::BadRequest(format!("{} is not a number: {:?}", field, s)))?,
        };
        if !value.is_finite() {
            return Err(ApiError::BadRequest(format!("{} must be finite", field)));
        }
        Ok(value)
    }
}

/// Raw request body; every field is optional until validated
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Base64-encoded file contents
    pub audio_data: Option<String>,
    pub start: Option<Seconds>,
    pub end: Option<Seconds>,
}

/// Request that passed validation, with the payload decoded
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub filename: String,
    pub content_type: String,
    pub audio: Vec<u8>,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl ValidatedRequest {
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

fn required(field: Option<String>) -> Result<String, ApiError> {
    field
        .filter(|value| !value.trim().is_empty())
        .ok_or(ApiError::MissingParameters)
}

impl ProcessRequest {
    /// Check required fields, decode the payload and parse the window.
    /// `start` and `end` default to 0.
    pub fn validate(self) -> Result<ValidatedRequest, ApiError> {
        let filename = required(self.filename)?;
        let content_type = required(self.content_type)?;
        let audio_data = required(self.audio_data)?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(audio_data.trim())
            .map_err(|e| ApiError::BadRequest(format!("audio_data is not valid base64: {}", e)))?;

        let start_seconds = self.start.map_or(Ok(0.0), |s| s.value("start"))?;
        let end_seconds = self.end.map_or(Ok(0.0), |s| s.value("end"))?;
        if start_seconds < 0.0 {
            return Err(ApiError::BadRequest(format!(
                "start must be non-negative, got {}",
                start_seconds
            )));
        }

        Ok(ValidatedRequest {
            filename,
            content_type,
            audio,
            start_seconds,
            end_seconds,
        })
    }
}

/// Machine-readable failure returned next to the duration bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&PipelineError> for ErrorBody {
    fn from(error: &PipelineError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Response body: bucket message plus the winning label, or `null` on failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResponse {
    pub message: DurationBucket,
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}
