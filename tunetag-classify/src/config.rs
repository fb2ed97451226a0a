//! Service configuration
//!
//! Priority: CLI arguments > environment (via clap `env`) > TOML file >
//! built-in defaults. The TOML file is located by
//! `tunetag_common::config::resolve_config_path`. Relative `uploads_dir` and
//! `model_path` values are resolved against the root folder.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tunetag_common::config::{
    load_toml_config, resolve_config_path, resolve_root_folder, CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR,
};
use tunetag_common::{Error, Result};

use crate::classifier::{default_labels, GenreLabels, TensorLayout};
use crate::pipeline::{Segmenter, TargetShape};

/// Module name used for config file discovery
pub const MODULE_NAME: &str = "classify";

/// Bootstrap configuration for the classification service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: IpAddr,
    /// HTTP server port
    pub port: u16,
    /// Data root; defaults to `TUNETAG_ROOT_FOLDER`, then the platform data dir
    pub root_folder: PathBuf,
    /// Where uploaded recordings are stored (relative to `root_folder`)
    pub uploads_dir: PathBuf,
    /// ONNX classifier weights (relative to `root_folder`)
    pub model_path: PathBuf,
    pub model_layout: TensorLayout,
    /// The single origin allowed by CORS
    pub allowed_origin: String,
    /// Request body limit in bytes (base64 payload included)
    pub max_body_bytes: usize,
    /// Concurrent blocking jobs across all requests
    pub max_workers: usize,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    /// File the configuration was read from; `None` for compiled defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunk_seconds: f64,
    pub overlap_seconds: f64,
    pub target_rows: usize,
    pub target_cols: usize,
    /// Ordered genre labels; index i is model class i
    pub labels: Vec<String>,
    /// Resample decoded audio to this rate; native rate when unset
    pub target_sample_rate: Option<u32>,
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    pub level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            root_folder: resolve_root_folder(None, ROOT_FOLDER_ENV_VAR),
            uploads_dir: PathBuf::from("uploads"),
            model_path: PathBuf::from("models").join("genre.onnx"),
            model_layout: TensorLayout::default(),
            allowed_origin: "http://127.0.0.1:8000".to_string(),
            max_body_bytes: 100 * 1024 * 1024,
            max_workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
            source: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: 4.0,
            overlap_seconds: 2.0,
            target_rows: 150,
            target_cols: 150,
            labels: default_labels(),
            target_sample_rate: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Command-line overrides, applied over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
}

impl ServiceConfig {
    /// Locate, parse, override and validate the configuration
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let path = resolve_config_path(
            overrides.config_path.as_deref(),
            CONFIG_ENV_VAR,
            MODULE_NAME,
        )?;
        let mut config: ServiceConfig = load_toml_config(path.as_deref())?;

        config.source = path;
        if let Some(port) = overrides.port {
            config.port = port;
        }
        if let Some(root_folder) = overrides.root_folder {
            config.root_folder = root_folder;
        }
        if let Some(model_path) = overrides.model_path {
            config.model_path = model_path;
        }
        if let Some(uploads_dir) = overrides.uploads_dir {
            config.uploads_dir = uploads_dir;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.segmenter()?;
        self.labels()?;
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }
        if self.pipeline.target_rows == 0 || self.pipeline.target_cols == 0 {
            return Err(Error::Config(format!(
                "target shape must be non-zero, got {}x{}",
                self.pipeline.target_rows, self.pipeline.target_cols
            )));
        }
        if self.pipeline.target_sample_rate == Some(0) {
            return Err(Error::Config("target_sample_rate must be positive".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::Config("max_body_bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// Filter directive from `[logging] level`, used when RUST_LOG is unset
    pub fn log_filter(&self) -> String {
        let level = &self.logging.level;
        format!(
            "tunetag_classify={level},tunetag_common={level},tower_http={level}",
            level = level
        )
    }

    /// Upload directory, absolute or under the root folder
    pub fn resolved_uploads_dir(&self) -> PathBuf {
        self.root_folder.join(&self.uploads_dir)
    }

    /// Model file, absolute or under the root folder
    pub fn resolved_model_path(&self) -> PathBuf {
        self.root_folder.join(&self.model_path)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn segmenter(&self) -> Result<Segmenter> {
        Segmenter::new(self.pipeline.chunk_seconds, self.pipeline.overlap_seconds)
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn labels(&self) -> Result<GenreLabels> {
        GenreLabels::new(self.pipeline.labels.clone())
            .ok_or_else(|| Error::Config("pipeline.labels must not be empty".to_string()))
    }

    pub fn target_shape(&self) -> TargetShape {
        TargetShape::new(self.pipeline.target_rows, self.pipeline.target_cols)
    }
}
