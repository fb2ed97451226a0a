//! Mel spectrogram feature maps
//!
//! Transform configuration is fixed: 2048-point FFT, hop 512, 128 mel bands,
//! periodic Hann window, centered frames (zero padded by `FFT_SIZE / 2` on
//! both sides), power spectrum, Slaney mel scale with Slaney area
//! normalization over `[0, sample_rate / 2]`.
//!
//! The natural `N_MELS x (1 + len / HOP_SIZE)` spectrogram is resized to the
//! configured target shape with bilinear interpolation (half-pixel centers,
//! edge clamped), so every map has identical dimensions whatever the chunk
//! length or sample rate. No further normalization is applied.

use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::warn;

pub const FFT_SIZE: usize = 2048;
pub const HOP_SIZE: usize = 512;
pub const N_MELS: usize = 128;

/// Feature map dimensions (rows x columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetShape {
    pub rows: usize,
    pub cols: usize,
}

impl TargetShape {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TargetShape {
    fn default() -> Self {
        Self::new(150, 150)
    }
}

/// Row-major 2-D feature array
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMap {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMap {
    pub fn zeros(shape: TargetShape) -> Self {
        Self {
            rows: shape.rows,
            cols: shape.cols,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn shape(&self) -> TargetShape {
        TargetShape::new(self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Extract one feature map with a freshly built plan
pub fn extract(samples: &[f32], sample_rate: u32, target: TargetShape) -> FeatureMap {
    MelPlan::new(sample_rate).extract(samples, target)
}

/// FFT plan, window and mel filterbank for one sample rate
///
/// Building the filterbank is the expensive part, so the pipeline builds one
/// plan per invocation and shares it across chunk workers.
pub struct MelPlan {
    sample_rate: u32,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    filters: Vec<MelFilter>,
}

/// Non-zero span of one triangular filter
struct MelFilter {
    first_bin: usize,
    weights: Vec<f32>,
}

impl MelPlan {
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        Self {
            sample_rate,
            fft,
            window: hann_window(FFT_SIZE),
            filters: build_mel_filters(N_MELS, FFT_SIZE, sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mel power spectrogram, `N_MELS` rows by one column per frame
    pub fn melspectrogram(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let pad = FFT_SIZE / 2;
        let frame_count = 1 + samples.len() / HOP_SIZE;

        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut power = vec![0.0f32; spectrum.len()];
        let mut mel = vec![vec![0.0f32; frame_count]; self.filters.len()];

        for frame in 0..frame_count {
            let origin = frame * HOP_SIZE;
            for (i, slot) in input.iter_mut().enumerate() {
                // Index into the virtually zero-padded signal
                let sample = (origin + i)
                    .checked_sub(pad)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = sample * self.window[i];
            }

            // The column stays zero on failure
            if let Err(e) = self.fft.process(&mut input, &mut spectrum) {
                warn!(frame, "FFT failed, frame left silent: {}", e);
                continue;
            }

            for (p, bin) in power.iter_mut().zip(spectrum.iter()) {
                *p = bin.norm_sqr();
            }

            for (row, filter) in mel.iter_mut().zip(self.filters.iter()) {
                row[frame] = filter
                    .weights
                    .iter()
                    .zip(&power[filter.first_bin..])
                    .map(|(w, p)| w * p)
                    .sum();
            }
        }

        mel
    }

    /// Mel spectrogram resized to `target`
    pub fn extract(&self, samples: &[f32], target: TargetShape) -> FeatureMap {
        if samples.is_empty() {
            return FeatureMap::zeros(target);
        }
        let mel = self.melspectrogram(samples);
        resize_bilinear(&mel, target)
    }
}

/// Bilinear resize with half-pixel centers and edge clamping
pub fn resize_bilinear(src: &[Vec<f32>], target: TargetShape) -> FeatureMap {
    let src_rows = src.len();
    let src_cols = src.first().map_or(0, Vec::len);
    if src_rows == 0 || src_cols == 0 {
        return FeatureMap::zeros(target);
    }

    let row_taps = interpolation_taps(src_rows, target.rows);
    let col_taps = interpolation_taps(src_cols, target.cols);

    let mut data = Vec::with_capacity(target.len());
    for &(r0, r1, wr) in &row_taps {
        let (top, bottom) = (&src[r0], &src[r1]);
        for &(c0, c1, wc) in &col_taps {
            let upper = top[c0] * (1.0 - wc) + top[c1] * wc;
            let lower = bottom[c0] * (1.0 - wc) + bottom[c1] * wc;
            data.push(upper * (1.0 - wr) + lower * wr);
        }
    }

    FeatureMap {
        rows: target.rows,
        cols: target.cols,
        data,
    }
}

/// Source indices and weight of the upper neighbour for every output index
fn interpolation_taps(src_len: usize, dst_len: usize) -> Vec<(usize, usize, f32)> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|dst| {
            let pos = (dst as f64 + 0.5) * scale - 0.5;
            let mut lower = pos.floor();
            let mut frac = pos - lower;
            if lower < 0.0 {
                lower = 0.0;
                frac = 0.0;
            }
            let mut lower = lower as usize;
            if lower >= src_len - 1 {
                lower = src_len - 1;
                frac = 0.0;
            }
            let upper = (lower + 1).min(src_len - 1);
            (lower, upper, frac as f32)
        })
        .collect()
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

fn build_mel_filters(n_mels: usize, fft_size: usize, sample_rate: u32) -> Vec<MelFilter> {
    let sr = sample_rate as f64;
    let freq_bins = fft_size / 2 + 1;
    let fft_freqs: Vec<f64> = (0..freq_bins)
        .map(|k| k as f64 * sr / fft_size as f64)
        .collect();

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sr / 2.0);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
            let norm = 2.0 / (right - left);

            let weights: Vec<f32> = fft_freqs
                .iter()
                .map(|&f| {
                    let rising = (f - left) / (center - left);
                    let falling = (right - f) / (right - center);
                    (rising.min(falling).max(0.0) * norm) as f32
                })
                .collect();

            let first_bin = weights.iter().position(|&w| w > 0.0).unwrap_or(0);
            let last_bin = weights
                .iter()
                .rposition(|&w| w > 0.0)
                .map_or(first_bin, |i| i + 1);

            MelFilter {
                first_bin,
                weights: weights[first_bin..last_bin].to_vec(),
            }
        })
        .collect()
}

// Slaney mel scale: linear below 1 kHz, logarithmic above
const MEL_F_SP: f64 = 200.0 / 3.0;
const MEL_MIN_LOG_HZ: f64 = 1000.0;
const MEL_MIN_LOG_MEL: f64 = MEL_MIN_LOG_HZ / MEL_F_SP;

fn mel_log_step() -> f64 {
    6.4f64.ln() / 27.0
}

fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MEL_MIN_LOG_HZ {
        MEL_MIN_LOG_MEL + (hz / MEL_MIN_LOG_HZ).ln() / mel_log_step()
    } else {
        hz / MEL_F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MEL_MIN_LOG_MEL {
        MEL_MIN_LOG_HZ * (mel_log_step() * (mel - MEL_MIN_LOG_MEL)).exp()
    } else {
        mel * MEL_F_SP
    }
}
