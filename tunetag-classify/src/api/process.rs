//! POST /process: store an uploaded recording and classify a window of it

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    audio::SourceRef,
    error::{pipeline_status, ApiError, ApiResult},
    models::{ErrorBody, ProcessRequest, ProcessResponse},
    AppState,
};

/// POST /process
///
/// Validation failures are returned as `ApiError`. Once the pipeline runs,
/// the duration bucket is always in the body, with `output: null` and an
/// `error` object when classification fails.
pub async fn process_audio(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    let request_id = Uuid::new_v4();
    let span = info_span!("process", request_id = %request_id);
    handle(state, request_id, payload).instrument(span).await
}

async fn handle(
    state: AppState,
    request_id: Uuid,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = request.validate().map_err(|e| {
        warn!("Rejected request: {}", e);
        e
    })?;

    let path = state
        .uploads
        .save(request_id, &request.filename, &request.audio)
        .await?;
    info!(
        file = %path.display(),
        content_type = %request.content_type,
        start = request.start_seconds,
        end = request.end_seconds,
        "Processing upload"
    );

    let source = SourceRef::new(path).with_content_type(request.content_type);
    let outcome = state
        .pipeline
        .process(&source, request.start_seconds, request.end_seconds)
        .await;

    let (status, response) = match outcome.result {
        Ok(label) => (
            StatusCode::OK,
            ProcessResponse {
                message: outcome.bucket,
                output: Some(label.label),
                error: None,
            },
        ),
        Err(e) => (
            pipeline_status(&e),
            ProcessResponse {
                message: outcome.bucket,
                output: None,
                error: Some(ErrorBody::from(&e)),
            },
        ),
    };

    Ok((status, Json(response)))
}

/// Build classification routes
pub fn process_routes() -> Router<AppState> {
    Router::new().route("/process", post(process_audio))
}
