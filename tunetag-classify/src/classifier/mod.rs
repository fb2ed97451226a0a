//! Genre classifier service
//!
//! The classifier is consumed as a black box: a batch of fixed-shape feature
//! maps in, one class index per map out, same order. Implementations are
//! loaded once at start-up and shared behind an `Arc` by every pipeline run.

pub mod onnx;

pub use onnx::{OnnxClassifier, TensorLayout};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::pipeline::FeatureMap;

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model artifact missing or unreadable
    #[error("Failed to load model {path}: {reason}")]
    Load { path: String, reason: String },

    /// Inference runtime failure
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Output not shaped `batch x classes`, or holding non-finite scores
    #[error("Unexpected output shape: {0}")]
    Shape(String),

    /// Called with zero feature maps
    #[error("Empty batch")]
    EmptyBatch,

    /// Used after `close()`
    #[error("Classifier is closed")]
    Closed,
}

/// Index into the ordered genre label enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassIndex(pub usize);

impl fmt::Display for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed, ordered genre labels known at deployment time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreLabels {
    labels: Vec<String>,
}

impl GenreLabels {
    /// `None` if `labels` is empty
    pub fn new(labels: Vec<String>) -> Option<Self> {
        (!labels.is_empty()).then_some(Self { labels })
    }

    pub fn label(&self, index: ClassIndex) -> Option<&str> {
        self.labels.get(index.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for GenreLabels {
    fn default() -> Self {
        Self {
            labels: default_labels(),
        }
    }
}

/// Deployment default label order
pub fn default_labels() -> Vec<String> {
    ["classical", "jazz", "pop", "rock"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Batch genre classifier
///
/// Must be safe to call from several pipeline runs at once. Implementations
/// whose runtime needs exclusive access serialize internally.
pub trait GenreClassifier: Send + Sync {
    /// One class index per input map, in input order
    fn predict_batch(&self, maps: &[FeatureMap]) -> Result<Vec<ClassIndex>, ClassifierError>;

    /// Release runtime resources. Later calls to `predict_batch` fail.
    fn close(&self) {}
}

/// Index of the highest score; the first one wins on equal scores
///
/// NaN scores are skipped wherever they sit, so an all-NaN row gives `None`.
pub fn argmax(scores: &[f32]) -> Option<ClassIndex> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| ClassIndex(index))
}

/// Row-wise argmax of a flat `batch x classes` score matrix
pub fn argmax_rows(
    scores: &[f32],
    batch: usize,
    classes: usize,
) -> Result<Vec<ClassIndex>, ClassifierError> {
    if classes == 0 || scores.len() != batch * classes {
        return Err(ClassifierError::Shape(format!(
            "expected {} x {} scores, got {}",
            batch,
            classes,
            scores.len()
        )));
    }
    if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
        return Err(ClassifierError::Shape(format!(
            "non-finite score {} at row {} class {}",
            scores[index],
            index / classes,
            index % classes
        )));
    }
    scores
        .chunks_exact(classes)
        .map(|row| {
            argmax(row).ok_or_else(|| ClassifierError::Shape("empty score row".to_string()))
        })
        .collect()
}
