//! Audio input: mono waveforms and the sources that produce them

pub mod source;
pub mod waveform;

pub use source::{window_samples, FileWaveformSource, SourceError, SourceRef, WaveformSource};
pub use waveform::{downmix_interleaved, Waveform, WaveformError};
