//! Test helper utilities shared by the integration tests

#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{generate_tone_wav, tone_wav_bytes, ToneConfig};

use std::sync::atomic::{AtomicUsize, Ordering};
use tunetag_classify::classifier::{ClassIndex, ClassifierError, GenreClassifier};
use tunetag_classify::pipeline::FeatureMap;

/// Classifier stub predicting one fixed class for every map
pub struct FixedClassifier {
    class: ClassIndex,
    calls: AtomicUsize,
    maps_seen: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(class: usize) -> Self {
        Self {
            class: ClassIndex(class),
            calls: AtomicUsize::new(0),
            maps_seen: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn maps_seen(&self) -> usize {
        self.maps_seen.load(Ordering::SeqCst)
    }
}

impl GenreClassifier for FixedClassifier {
    fn predict_batch(&self, maps: &[FeatureMap]) -> Result<Vec<ClassIndex>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.maps_seen.fetch_add(maps.len(), Ordering::SeqCst);
        Ok(vec![self.class; maps.len()])
    }
}
