use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec};

/// Decoded audio: mono samples in [-1.0, 1.0] plus the file's original spec.
pub struct LoadedAudio {
    pub samples: Vec<f32>,
    pub spec: WavSpec,
}

impl LoadedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.spec.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.spec.sample_rate as f32
    }
}

/// Load a WAV file as mono f32. Multi-channel files are averaged down.
pub fn load_mono(path: &Path) -> Result<LoadedAudio> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()
            .context("Failed to read WAV samples")?,
    };

    let samples = downmix(&interleaved, spec.channels);

    Ok(LoadedAudio { samples, spec })
}

/// Average interleaved channels into one. Mono input is returned as-is;
/// a trailing partial frame is dropped.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
