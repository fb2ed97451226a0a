//! ONNX Runtime backed classifier
//!
//! `Session::run` needs exclusive access, so the session sits behind a mutex
//! and concurrent pipeline runs are serialized at inference. Everything else
//! in the pipeline (decode, features) still runs in parallel.

use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use super::{argmax_rows, ClassIndex, ClassifierError, GenreClassifier};
use crate::pipeline::FeatureMap;

/// Input tensor layout expected by the exported model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[batch, rows, cols, 1]` (Keras channels-last)
    #[default]
    Nhwc,
    /// `[batch, 1, rows, cols]`
    Nchw,
    /// `[batch, rows, cols]`
    Nhw,
}

impl TensorLayout {
    pub fn shape(&self, batch: usize, rows: usize, cols: usize) -> Vec<usize> {
        match self {
            TensorLayout::Nhwc => vec![batch, rows, cols, 1],
            TensorLayout::Nchw => vec![batch, 1, rows, cols],
            TensorLayout::Nhw => vec![batch, rows, cols],
        }
    }
}

/// Classifier running an ONNX model with one input and a `batch x classes` output
pub struct OnnxClassifier {
    session: Mutex<Option<Session>>,
    layout: TensorLayout,
    classes: usize,
}

impl OnnxClassifier {
    /// Load the model once; `classes` is the label count the output must match
    pub fn load(path: &Path, layout: TensorLayout, classes: usize) -> Result<Self, ClassifierError> {
        let load_error = |reason: String| ClassifierError::Load {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(load_error("file does not exist".to_string()));
        }

        info!("Loading classifier model: {}", path.display());
        let session = Session::builder()
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| load_error(e.to_string()))?;
        info!(?layout, classes, "Classifier model loaded");

        Ok(Self {
            session: Mutex::new(Some(session)),
            layout,
            classes,
        })
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    fn input_tensor(&self, maps: &[FeatureMap]) -> Result<ArrayD<f32>, ClassifierError> {
        let shape = maps[0].shape();
        if let Some(odd) = maps.iter().find(|m| m.shape() != shape) {
            return Err(ClassifierError::Shape(format!(
                "mixed feature map shapes {:?} and {:?}",
                shape,
                odd.shape()
            )));
        }

        let mut flat = Vec::with_capacity(maps.len() * shape.len());
        for map in maps {
            flat.extend_from_slice(map.as_slice());
        }

        let dims = self.layout.shape(maps.len(), shape.rows, shape.cols);
        ArrayD::from_shape_vec(IxDyn(&dims), flat)
            .map_err(|e| ClassifierError::Shape(format!("input tensor: {}", e)))
    }
}

impl GenreClassifier for OnnxClassifier {
    fn predict_batch(&self, maps: &[FeatureMap]) -> Result<Vec<ClassIndex>, ClassifierError> {
        if maps.is_empty() {
            return Err(ClassifierError::EmptyBatch);
        }

        let input = self.input_tensor(maps)?;
        let input = Tensor::from_array(input)
            .map_err(|e| ClassifierError::Inference(format!("tensor creation: {}", e)))?;

        let mut guard = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("session lock poisoned".to_string()))?;
        let session = guard.as_mut().ok_or(ClassifierError::Closed)?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let (_, scores) = outputs
            .iter()
            .next()
            .ok_or_else(|| ClassifierError::Shape("model produced no output".to_string()))?;
        let (_shape, scores) = scores
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Shape(format!("score extraction: {}", e)))?;

        debug!(batch = maps.len(), scores = scores.len(), "Inference complete");
        argmax_rows(scores, maps.len(), self.classes)
    }

    fn close(&self) {
        if let Ok(mut guard) = self.session.lock() {
            if guard.take().is_some() {
                info!("Classifier session released");
            }
        }
    }
}
