//! Waveform source: decode a time window of a stored recording
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, FLAC, AAC, OGG, ...).
//! Channels are averaged to mono. The native sample rate is kept unless a
//! target rate is configured, in which case rubato resamples.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

use super::waveform::{downmix_interleaved, Waveform};

/// Waveform source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Recording does not exist
    #[error("Recording not found: {0}")]
    NotFound(String),

    /// Recording could not be opened
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container or codec failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample rate conversion failure
    #[error("Resample error: {0}")]
    Resample(String),
}

/// Reference to a stored recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub path: PathBuf,
    /// MIME type hint for container detection (e.g. `audio/mpeg`)
    pub content_type: Option<String>,
}

impl SourceRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Supplies a mono waveform for `[start, start + duration)` of a recording
///
/// Implementations are blocking; the pipeline calls them from its worker pool.
pub trait WaveformSource: Send + Sync {
    fn load_window(
        &self,
        source: &SourceRef,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Result<Waveform, SourceError>;
}

/// Decodes recordings from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileWaveformSource {
    /// Resample to this rate; `None` keeps the native rate
    target_sample_rate: Option<u32>,
}

impl FileWaveformSource {
    pub fn new(target_sample_rate: Option<u32>) -> Self {
        Self { target_sample_rate }
    }
}

impl WaveformSource for FileWaveformSource {
    fn load_window(
        &self,
        source: &SourceRef,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Result<Waveform, SourceError> {
        let path = source.path.as_path();
        if !path.exists() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }

        let (samples, native_rate) =
            decode_window(path, source.content_type.as_deref(), start_seconds, duration_seconds)?;

        let (samples, sample_rate) = match self.target_sample_rate {
            Some(target) if target != native_rate => {
                (resample_mono(samples, native_rate, target)?, target)
            }
            _ => (samples, native_rate),
        };

        debug!(
            file = %path.display(),
            start_seconds,
            duration_seconds,
            samples = samples.len(),
            sample_rate,
            "Loaded waveform window"
        );

        Waveform::new(samples, sample_rate).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

/// Sample range `[start, end)` for a window at `sample_rate`
///
/// Non-positive or NaN durations give an empty range; an infinite duration
/// runs to the end of the recording.
pub fn window_samples(start_seconds: f64, duration_seconds: f64, sample_rate: u32) -> (u64, u64) {
    let rate = sample_rate as f64;
    let start = (start_seconds.max(0.0) * rate).round() as u64;
    if duration_seconds.is_nan() || duration_seconds <= 0.0 {
        return (start, start);
    }
    if duration_seconds.is_infinite() {
        return (start, u64::MAX);
    }
    let length = (duration_seconds * rate).round() as u64;
    (start, start.saturating_add(length))
}

/// Decode the window to mono f32 at the native rate
fn decode_window(
    path: &Path,
    content_type: Option<&str>,
    start_seconds: f64,
    duration_seconds: f64,
) -> Result<(Vec<f32>, u32), SourceError> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }
    if let Some(mime) = content_type {
        hint.mime_type(mime);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SourceError::Decode(format!("detect format of {}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SourceError::Decode("no audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| SourceError::Decode("track missing sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| SourceError::Decode(format!("create decoder: {}", e)))?;

    let (start_frame, end_frame) = window_samples(start_seconds, duration_seconds, sample_rate);
    let mut mono = Vec::new();
    let mut current_frame = 0u64;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    while current_frame < end_frame {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(SourceError::Decode(format!("read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping corrupt packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(SourceError::Decode(format!("decode packet: {}", e))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        if buf.capacity() < decoded.capacity() * channels {
            *buf = SampleBuffer::new(decoded.capacity() as u64, spec);
        }
        buf.copy_interleaved_ref(decoded);

        let frames = downmix_interleaved(buf.samples(), channels);
        let packet_start = current_frame;
        let packet_end = current_frame + frames.len() as u64;

        if packet_end > start_frame && packet_start < end_frame {
            let from = (start_frame.max(packet_start) - packet_start) as usize;
            let to = (end_frame.min(packet_end) - packet_start) as usize;
            mono.extend_from_slice(&frames[from..to]);
        }

        current_frame = packet_end;
    }

    Ok((mono, sample_rate))
}

/// Resample mono PCM with rubato sinc interpolation
///
/// The output is aligned with the input (the filter delay is trimmed) and
/// holds exactly `round(len * target / source)` frames.
fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>, SourceError> {
    if samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let frames = samples.len();
    let expected = (frames as f64 * ratio).round() as usize;

    // Chunk size equal to input length: one full pass, then flush the delay line
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, 1)
        .map_err(|e| SourceError::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| SourceError::Resample(e.to_string()))?
        .swap_remove(0);
    while output.len() < delay + expected {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| SourceError::Resample(e.to_string()))?
            .swap_remove(0);
        if tail.is_empty() {
            break;
        }
        output.extend_from_slice(&tail);
    }

    let mut output = output.split_off(delay.min(output.len()));
    output.resize(expected, 0.0);

    debug!(
        "Resampled {} frames ({} Hz) → {} frames ({} Hz), delay {}",
        frames,
        source_rate,
        output.len(),
        target_rate,
        delay
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_samples_rounds_offsets() {
        assert_eq!(window_samples(1.0, 2.0, 22050), (22050, 3 * 22050));
        assert_eq!(window_samples(0.5, 0.25, 1000), (500, 750));
    }

    #[test]
    fn test_window_samples_degenerate_durations() {
        assert_eq!(window_samples(2.0, 0.0, 100), (200, 200));
        assert_eq!(window_samples(2.0, -3.0, 100), (200, 200));
        assert_eq!(window_samples(2.0, f64::NAN, 100), (200, 200));
        assert_eq!(window_samples(0.0, f64::INFINITY, 100), (0, u64::MAX));
    }

    #[test]
    fn test_negative_start_clamped() {
        assert_eq!(window_samples(-1.0, 1.0, 100), (0, 100));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let source = FileWaveformSource::default();
        let result = source.load_window(&SourceRef::new("/no/such/clip.wav"), 0.0, 10.0);
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![0.0f32; 4410];
        let resampled = resample_mono(samples, 44100, 22050).unwrap();
        assert_eq!(resampled.len(), 2205);
        assert!(resampled.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_resample_keeps_exact_chunk_length() {
        // 4s at 44.1 kHz must still be one full 4s chunk at 22.05 kHz
        let samples: Vec<f32> = (0..4 * 44100).map(|i| (i as f32 * 0.01).sin() * 0.3).collect();
        let resampled = resample_mono(samples, 44100, 22050).unwrap();
        assert_eq!(resampled.len(), 4 * 22050);

        let waveform = Waveform::new(resampled, 22050).unwrap();
        let chunks = crate::pipeline::Segmenter::default().segment(&waveform).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_resample_output_is_time_aligned() {
        // 50 Hz tone: after trimming the filter delay, output sample i
        // matches the tone at t = i / 22050
        let tone = |i: usize, rate: f32| (2.0 * std::f32::consts::PI * 50.0 * i as f32 / rate).sin();
        let samples: Vec<f32> = (0..44100).map(|i| 0.5 * tone(i, 44100.0)).collect();

        let resampled = resample_mono(samples, 44100, 22050).unwrap();

        for i in (2000..20000).step_by(997) {
            let expected = 0.5 * tone(i, 22050.0);
            assert!(
                (resampled[i] - expected).abs() < 0.05,
                "sample {}: got {} expected {}",
                i,
                resampled[i],
                expected
            );
        }
    }

    #[test]
    fn test_resample_upsamples_short_input() {
        let resampled = resample_mono(vec![0.25f32; 100], 22050, 44100).unwrap();
        assert_eq!(resampled.len(), 200);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample_mono(Vec::new(), 48000, 22050).unwrap().is_empty());
    }
}
