//! Overlapping fixed-length segmentation of a waveform
//!
//! With `C = round(chunk_seconds * sample_rate)` and
//! `S = C - round(overlap_seconds * sample_rate)`, chunk `i` covers
//! `[i * S, i * S + C)`. Enumeration stops at the first chunk that would
//! overrun the waveform, so a waveform of `L` samples yields
//! `max(0, floor((L - C) / S) + 1)` chunks. Partial chunks are never
//! emitted and nothing is zero-padded: a waveform shorter than `C` yields
//! no chunks at all.

use crate::audio::Waveform;

use super::error::PipelineError;

/// One fixed-length window borrowed from a [`Waveform`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk<'a> {
    /// Position in the chunk sequence
    pub index: usize,
    /// Start offset in samples
    pub start: usize,
    /// Exactly `chunk_samples` samples
    pub samples: &'a [f32],
}

impl Chunk<'_> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Chunk/overlap configuration in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segmenter {
    chunk_seconds: f64,
    overlap_seconds: f64,
}

impl Default for Segmenter {
    /// 4s chunks with 2s overlap
    fn default() -> Self {
        Self {
            chunk_seconds: 4.0,
            overlap_seconds: 2.0,
        }
    }
}

impl Segmenter {
    /// Create a segmenter, requiring `0 <= overlap < chunk`
    pub fn new(chunk_seconds: f64, overlap_seconds: f64) -> Result<Self, PipelineError> {
        if !chunk_seconds.is_finite() || chunk_seconds <= 0.0 {
            return Err(PipelineError::InvalidSegmentation(format!(
                "chunk duration must be positive, got {}",
                chunk_seconds
            )));
        }
        if !overlap_seconds.is_finite() || overlap_seconds < 0.0 {
            return Err(PipelineError::InvalidSegmentation(format!(
                "overlap duration must be non-negative, got {}",
                overlap_seconds
            )));
        }
        if overlap_seconds >= chunk_seconds {
            return Err(PipelineError::InvalidSegmentation(format!(
                "overlap ({}s) must be shorter than chunk ({}s)",
                overlap_seconds, chunk_seconds
            )));
        }
        Ok(Self {
            chunk_seconds,
            overlap_seconds,
        })
    }

    pub fn chunk_seconds(&self) -> f64 {
        self.chunk_seconds
    }

    pub fn overlap_seconds(&self) -> f64 {
        self.overlap_seconds
    }

    /// Chunk length in samples at `sample_rate`
    pub fn chunk_samples(&self, sample_rate: u32) -> usize {
        (self.chunk_seconds * sample_rate as f64).round() as usize
    }

    /// Distance between consecutive chunk starts in samples at `sample_rate`
    ///
    /// Saturates at zero; [`segment`](Self::segment) rejects a zero stride.
    pub fn stride_samples(&self, sample_rate: u32) -> usize {
        let overlap_samples = (self.overlap_seconds * sample_rate as f64).round() as usize;
        self.chunk_samples(sample_rate).saturating_sub(overlap_samples)
    }

    /// Split `waveform` into overlapping chunks, ordered by start offset
    pub fn segment<'a>(&self, waveform: &'a Waveform) -> Result<Vec<Chunk<'a>>, PipelineError> {
        let sample_rate = waveform.sample_rate();
        let chunk_samples = self.chunk_samples(sample_rate);
        let stride_samples = self.stride_samples(sample_rate);

        if chunk_samples == 0 || stride_samples == 0 {
            return Err(PipelineError::InvalidSegmentation(format!(
                "chunk {}s / overlap {}s gives chunk={} stride={} samples at {} Hz",
                self.chunk_seconds, self.overlap_seconds, chunk_samples, stride_samples, sample_rate
            )));
        }

        let samples = waveform.samples();
        let chunks = (0..)
            .map(|index| (index, index * stride_samples))
            .take_while(|&(_, start)| start + chunk_samples <= samples.len())
            .map(|(index, start)| Chunk {
                index,
                start,
                samples: &samples[start..start + chunk_samples],
            })
            .collect();

        Ok(chunks)
    }
}
