//! Pipeline error type
//!
//! Every failure of a classification run surfaces as one of these variants.
//! Nothing in the pipeline retries: the audio is static input.

use thiserror::Error;

use crate::audio::SourceError;
use crate::classifier::ClassifierError;

/// Classification pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Referenced recording does not exist
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// Window shorter than one segmentation chunk
    #[error("No chunks produced: {samples} samples is shorter than one {chunk_samples}-sample chunk")]
    NoChunksProduced { samples: usize, chunk_samples: usize },

    /// Aggregator invoked with zero predictions (orchestration bug)
    #[error("Aggregator received no predictions")]
    EmptyInput,

    /// Recording exists but could not be decoded
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Chunk/overlap configuration unusable at this sample rate
    #[error("Invalid segmentation: {0}")]
    InvalidSegmentation(String),

    /// Classifier failed or returned malformed output
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Classifier returned an index with no label
    #[error("Class index {index} outside label set of {classes}")]
    UnknownClass { index: usize, classes: usize },

    /// Blocking worker panicked or the pool was shut down
    #[error("Worker error: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            PipelineError::NoChunksProduced { .. } => "NO_CHUNKS_PRODUCED",
            PipelineError::EmptyInput => "EMPTY_INPUT",
            PipelineError::Decode(_) => "DECODE_ERROR",
            PipelineError::InvalidSegmentation(_) => "INVALID_SEGMENTATION",
            PipelineError::Classifier(_) => "CLASSIFIER_ERROR",
            PipelineError::UnknownClass { .. } => "UNKNOWN_CLASS",
            PipelineError::Worker(_) => "WORKER_ERROR",
        }
    }
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(reference) => PipelineError::SourceNotFound(reference),
            other => PipelineError::Decode(other.to_string()),
        }
    }
}
