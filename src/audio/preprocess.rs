use std::f32::consts::{FRAC_1_SQRT_2, PI};

use serde::{Deserialize, Serialize};

use crate::dsp::loudness::frame_rms;

const TRIM_FRAME: usize = 2048;
const TRIM_HOP: usize = 512;

/// Cleanup applied to audio before pitch tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Frames quieter than this many dB below the loudest frame are
    /// considered silence at the start and end of the recording.
    pub trim_top_db: f32,
    /// Scale so the loudest sample reaches ±1.0.
    pub normalize: bool,
    /// High-pass cutoff in Hz; 0 disables the filter.
    pub highpass_hz: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            trim_top_db: 20.0,
            normalize: true,
            highpass_hz: 80.0,
        }
    }
}

/// Basic level and timing facts about a recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStats {
    pub duration: f32,
    pub sample_rate: u32,
    pub channels: u16,
    pub max_amplitude: f32,
    pub rms_energy: f32,
    pub zero_crossing_rate: f32,
}

/// Result of preprocessing: the cleaned samples and how much was cut from
/// the front (so note times can be related back to the file).
pub struct Preprocessed {
    pub samples: Vec<f32>,
    pub trimmed_start_secs: f32,
}

/// Trim silence, normalize, then high-pass.
pub fn preprocess(samples: &[f32], sample_rate: u32, config: &PreprocessConfig) -> Preprocessed {
    let (start, end) = trim_bounds(samples, config.trim_top_db);
    let mut out = samples[start..end].to_vec();
    log::info!(
        "Trimmed {} leading and {} trailing samples",
        start,
        samples.len() - end
    );

    if config.normalize {
        normalize_peak(&mut out);
    }
    if config.highpass_hz > 0.0 {
        out = highpass_zero_phase(&out, sample_rate, config.highpass_hz);
    }

    Preprocessed {
        samples: out,
        trimmed_start_secs: if sample_rate > 0 {
            start as f32 / sample_rate as f32
        } else {
            0.0
        },
    }
}

/// Sample range `[start, end)` left after cutting quiet frames off both ends.
///
/// A frame is quiet when its RMS is more than `top_db` below the loudest
/// frame's RMS. Audio that is all quiet, or too short to frame, is kept whole.
pub fn trim_bounds(samples: &[f32], top_db: f32) -> (usize, usize) {
    let full = (0, samples.len());
    if samples.len() < TRIM_FRAME {
        return full;
    }

    let rms: Vec<f32> = (0..=(samples.len() - TRIM_FRAME) / TRIM_HOP)
        .map(|i| frame_rms(&samples[i * TRIM_HOP..i * TRIM_HOP + TRIM_FRAME]))
        .collect();

    let peak = rms.iter().copied().fold(0.0_f32, f32::max);
    if peak <= 0.0 {
        return full;
    }
    let threshold = peak * 10.0_f32.powf(-top_db / 20.0);

    let first = rms.iter().position(|&r| r >= threshold);
    let last = rms.iter().rposition(|&r| r >= threshold);

    match (first, last) {
        (Some(f), Some(l)) => (
            f * TRIM_HOP,
            (l * TRIM_HOP + TRIM_FRAME).min(samples.len()),
        ),
        _ => full,
    }
}

/// Scale in place so the peak absolute sample is 1.0. Silence is untouched.
pub fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
}

/// Second-order Butterworth high-pass run forward then backward, which
/// cancels the phase shift and doubles the slope (like `filtfilt`).
///
/// Returns the input unchanged when the cutoff is not below Nyquist.
pub fn highpass_zero_phase(samples: &[f32], sample_rate: u32, cutoff_hz: f32) -> Vec<f32> {
    let nyquist = sample_rate as f32 / 2.0;
    if cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
        log::warn!("High-pass cutoff {cutoff_hz} Hz out of range, skipping filter");
        return samples.to_vec();
    }

    let biquad = Biquad::highpass(sample_rate as f32, cutoff_hz);
    let mut forward = biquad.run(samples.iter().copied());
    forward.reverse();
    let mut out = biquad.run(forward.into_iter());
    out.reverse();
    out
}

/// Direct form I biquad coefficients (RBJ cookbook), normalized by a0.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Biquad {
    fn highpass(sample_rate: f32, cutoff_hz: f32) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 + cos) / 2.0 / a0,
            b1: -(1.0 + cos) / a0,
            b2: (1.0 + cos) / 2.0 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn run(&self, input: impl Iterator<Item = f32>) -> Vec<f32> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .map(|x| {
                let y = self.b0 * x + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
                x2 = x1;
                x1 = x;
                y2 = y1;
                y1 = y;
                y
            })
            .collect()
    }
}

/// Level statistics for a mono buffer.
pub fn audio_stats(samples: &[f32], sample_rate: u32, channels: u16) -> AudioStats {
    let duration = if sample_rate > 0 {
        samples.len() as f32 / sample_rate as f32
    } else {
        0.0
    };
    let max_amplitude = samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));

    AudioStats {
        duration,
        sample_rate,
        channels,
        max_amplitude,
        rms_energy: frame_rms(samples),
        zero_crossing_rate: zero_crossing_rate(samples),
    }
}

/// Fraction of adjacent sample pairs whose sign differs.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}
