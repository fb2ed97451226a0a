//! Mono waveform produced by a [`WaveformSource`](super::WaveformSource)

use thiserror::Error;

/// Waveform construction errors
#[derive(Debug, Error, PartialEq)]
pub enum WaveformError {
    /// Sample rate must be a positive integer
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Mono PCM samples plus their sample rate
///
/// Immutable once produced. Samples are f32, nominally in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Create a waveform, rejecting a zero sample rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, WaveformError> {
        if sample_rate == 0 {
            return Err(WaveformError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Average interleaved frames down to one channel
pub fn downmix_interleaved(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
