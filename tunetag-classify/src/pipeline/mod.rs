//! Genre classification pipeline
//!
//! WaveformSource → Segmenter → FeatureExtractor → GenreClassifier →
//! Aggregator. The components are synchronous and pure; this module owns all
//! concurrency. Each invocation suspends at exactly three points (waveform
//! load, feature extraction, inference), each offloaded through the
//! [`BlockingPool`].

pub mod aggregator;
pub mod duration;
pub mod error;
pub mod features;
pub mod segmenter;
pub mod worker_pool;

pub use aggregator::{aggregate, tally, Vote};
pub use duration::DurationBucket;
pub use error::PipelineError;
pub use features::{FeatureMap, MelPlan, TargetShape};
pub use segmenter::{Chunk, Segmenter};
pub use worker_pool::BlockingPool;

use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::audio::{SourceRef, Waveform, WaveformSource};
use crate::classifier::{ClassIndex, ClassifierError, GenreClassifier, GenreLabels};

/// Winning genre plus the per-chunk trace that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalLabel {
    pub class: ClassIndex,
    pub label: String,
    /// Chunks that voted for `class`
    pub votes: usize,
    /// Per-chunk predictions in chunk order
    pub predictions: Vec<ClassIndex>,
}

impl FinalLabel {
    pub fn chunk_count(&self) -> usize {
        self.predictions.len()
    }
}

/// Classification result plus the duration bucket, which is always reported
#[derive(Debug)]
pub struct ProcessOutcome {
    pub bucket: DurationBucket,
    pub result: Result<FinalLabel, PipelineError>,
}

/// Orchestrates one classification per call; shareable across requests
pub struct Pipeline {
    source: Arc<dyn WaveformSource>,
    classifier: Arc<dyn GenreClassifier>,
    labels: GenreLabels,
    segmenter: Segmenter,
    target_shape: TargetShape,
    pool: BlockingPool,
}

impl Pipeline {
    /// Pipeline with reference segmentation (4s / 2s), 150x150 maps and a
    /// worker pool sized to the number of CPUs
    pub fn new(
        source: Arc<dyn WaveformSource>,
        classifier: Arc<dyn GenreClassifier>,
        labels: GenreLabels,
    ) -> Self {
        let workers = std::thread::available_parallelism().map_or(4, |n| n.get());
        Self {
            source,
            classifier,
            labels,
            segmenter: Segmenter::default(),
            target_shape: TargetShape::default(),
            pool: BlockingPool::new(workers),
        }
    }

    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_target_shape(mut self, target_shape: TargetShape) -> Self {
        self.target_shape = target_shape;
        self
    }

    pub fn with_pool(mut self, pool: BlockingPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn labels(&self) -> &GenreLabels {
        &self.labels
    }

    pub fn segmenter(&self) -> Segmenter {
        self.segmenter
    }

    pub fn target_shape(&self) -> TargetShape {
        self.target_shape
    }

    /// Classify `[start_seconds, start_seconds + duration_seconds)` of `source`
    pub async fn classify(
        &self,
        source: &SourceRef,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Result<FinalLabel, PipelineError> {
        let waveform = {
            let loader = self.source.clone();
            let source = source.clone();
            self.pool
                .run("load", move || {
                    loader.load_window(&source, start_seconds, duration_seconds)
                })
                .await??
        };
        info!(
            file = %source.path.display(),
            start_seconds,
            duration_seconds,
            samples = waveform.len(),
            sample_rate = waveform.sample_rate(),
            "Loaded audio window"
        );

        let maps = {
            let segmenter = self.segmenter;
            let target_shape = self.target_shape;
            self.pool
                .run("features", move || {
                    extract_features(&waveform, segmenter, target_shape)
                })
                .await??
        };
        let batch = maps.len();

        let predictions = {
            let classifier = self.classifier.clone();
            self.pool
                .run("inference", move || classifier.predict_batch(&maps))
                .await??
        };
        if predictions.len() != batch {
            return Err(ClassifierError::Shape(format!(
                "{} predictions for {} feature maps",
                predictions.len(),
                batch
            ))
            .into());
        }

        let vote = tally(&predictions).map_err(|e| {
            error!("Contract violation: {} (batch of {})", e, batch);
            e
        })?;

        let label = self
            .labels
            .label(vote.class)
            .ok_or(PipelineError::UnknownClass {
                index: vote.class.0,
                classes: self.labels.len(),
            })?
            .to_string();

        info!(
            file = %source.path.display(),
            label = %label,
            chunks = batch,
            votes = vote.count,
            "Classification complete"
        );

        Ok(FinalLabel {
            class: vote.class,
            label,
            votes: vote.count,
            predictions,
        })
    }

    /// Classify `[start_seconds, end_seconds)` and bucket its length
    ///
    /// The bucket depends only on the requested window, so it is reported
    /// even when classification fails.
    pub async fn process(
        &self,
        source: &SourceRef,
        start_seconds: f64,
        end_seconds: f64,
    ) -> ProcessOutcome {
        let duration_seconds = end_seconds - start_seconds;
        let bucket = DurationBucket::from_seconds(duration_seconds);
        let result = self.classify(source, start_seconds, duration_seconds).await;
        if let Err(e) = &result {
            info!(code = e.code(), "Classification failed: {}", e);
        }
        ProcessOutcome { bucket, result }
    }
}

/// Segment `waveform` and extract one feature map per chunk, in chunk order
///
/// Chunks are processed in parallel; `collect` keeps chunk order.
pub fn extract_features(
    waveform: &Waveform,
    segmenter: Segmenter,
    target_shape: TargetShape,
) -> Result<Vec<FeatureMap>, PipelineError> {
    let chunks = segmenter.segment(waveform)?;
    if chunks.is_empty() {
        return Err(PipelineError::NoChunksProduced {
            samples: waveform.len(),
            chunk_samples: segmenter.chunk_samples(waveform.sample_rate()),
        });
    }

    let plan = MelPlan::new(waveform.sample_rate());
    Ok(chunks
        .par_iter()
        .map(|chunk| plan.extract(chunk.samples, target_shape))
        .collect())
}
