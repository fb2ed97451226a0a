//! tunetag-classify - genre classification microservice
//!
//! Accepts an uploaded recording plus a time window over HTTP and answers
//! with the majority-vote genre of the window's chunks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunetag_classify::audio::FileWaveformSource;
use tunetag_classify::classifier::{GenreClassifier, OnnxClassifier};
use tunetag_classify::config::{ConfigOverrides, ServiceConfig};
use tunetag_classify::pipeline::{BlockingPool, Pipeline};
use tunetag_classify::services::UploadStore;
use tunetag_classify::AppState;

/// Command-line arguments for tunetag-classify
#[derive(Parser, Debug)]
#[command(name = "tunetag-classify")]
#[command(about = "Genre classification microservice")]
#[command(version)]
struct Args {
    /// TOML config file (falls back to TUNETAG_CONFIG, then default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TUNETAG_PORT")]
    port: Option<u16>,

    /// Data root folder for relative upload and model paths
    #[arg(short, long, env = "TUNETAG_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// ONNX classifier model
    #[arg(short, long, env = "TUNETAG_MODEL")]
    model: Option<PathBuf>,

    /// Directory uploaded recordings are written to
    #[arg(long, env = "TUNETAG_UPLOADS_DIR")]
    uploads_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServiceConfig::load(ConfigOverrides {
        config_path: args.config,
        port: args.port,
        root_folder: args.root_folder,
        model_path: args.model,
        uploads_dir: args.uploads_dir,
    })
    .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tunetag-classify (Genre Classification) microservice");
    info!(
        "Version: {} ({}, {} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    match &config.source {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using compiled defaults"),
    }

    info!("Root folder: {}", config.root_folder.display());

    let labels = config.labels()?;
    let classifier = Arc::new(
        OnnxClassifier::load(&config.resolved_model_path(), config.model_layout, labels.len())
            .context("Failed to load classifier model")?,
    );

    let pipeline = Pipeline::new(
        Arc::new(FileWaveformSource::new(config.pipeline.target_sample_rate)),
        classifier.clone(),
        labels,
    )
    .with_segmenter(config.segmenter()?)
    .with_target_shape(config.target_shape())
    .with_pool(BlockingPool::new(config.max_workers));
    info!(
        chunk_seconds = config.pipeline.chunk_seconds,
        overlap_seconds = config.pipeline.overlap_seconds,
        rows = config.pipeline.target_rows,
        cols = config.pipeline.target_cols,
        max_workers = config.max_workers,
        "Pipeline initialized"
    );

    let uploads = UploadStore::new(config.resolved_uploads_dir());
    info!("Uploads: {}", uploads.dir().display());

    let state = AppState::new(Arc::new(pipeline), uploads);
    let app = tunetag_classify::build_router(state, &config)?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    classifier.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
