//! Audio test fixture generator
//!
//! 16-bit PCM WAV tones written with hound, either to disk or to memory.

use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

/// Configuration for a generated tone
#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 10.0,
            sample_rate: 22050,
            channels: 1,
            frequency: 440.0,
        }
    }
}

fn write_tone<W: Write + Seek>(writer: W, config: &ToneConfig) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(writer, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_samples {
        // 30% amplitude sine
        let t = i as f32 / config.sample_rate as f32;
        let sample =
            (0.3 * (2.0 * std::f32::consts::PI * config.frequency * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Write a tone WAV file to `path`
pub fn generate_tone_wav(path: &Path, config: &ToneConfig) -> anyhow::Result<PathBuf> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_tone(file, config)?;
    Ok(path.to_path_buf())
}

/// Encode a tone WAV in memory
pub fn tone_wav_bytes(config: &ToneConfig) -> anyhow::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_tone(&mut cursor, config)?;
    Ok(cursor.into_inner())
}
