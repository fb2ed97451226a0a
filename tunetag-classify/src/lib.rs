//! tunetag-classify: music genre classification of audio windows
//!
//! Library interface for the HTTP service and integration tests. The
//! classification core lives in [`pipeline`]; [`api`] is a thin HTTP
//! adapter over it.

pub mod api;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::pipeline::Pipeline;
use crate::services::UploadStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub uploads: UploadStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, uploads: UploadStore) -> Self {
        Self {
            pipeline,
            uploads,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router with CORS, body limit and request tracing
pub fn build_router(state: AppState, config: &ServiceConfig) -> tunetag_common::Result<Router> {
    let origin = HeaderValue::from_str(&config.allowed_origin).map_err(|e| {
        tunetag_common::Error::Config(format!(
            "invalid allowed_origin {:?}: {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .merge(api::process_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}
