use rustfft::{num_complex::Complex, FftPlanner};

use super::windowing;

/// Parameters for the spectral-flux onset envelope.
#[derive(Debug, Clone)]
pub struct OnsetConfig {
    /// FFT frame length in samples.
    pub frame_size: usize,
    /// Samples between consecutive frames.
    pub hop_size: usize,
    /// How far above the envelope mean a peak must rise to count as an onset.
    pub delta: f32,
    /// Minimum spacing between reported onsets. One frame length is
    /// always enforced on top of this.
    pub min_gap_ms: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            delta: 0.02,
            min_gap_ms: 30.0,
        }
    }
}

/// Onset strength per frame, normalized to [0, 1].
///
/// Spectral flux: for each frame, the summed increase in magnitude of every
/// frequency bin relative to the previous frame. Decreases are ignored, so
/// the envelope spikes where new energy appears (note attacks) and stays
/// flat through sustained notes and decays.
pub fn onset_envelope(samples: &[f32], config: &OnsetConfig) -> Vec<f32> {
    let n_frames = windowing::frame_count(samples.len(), config.frame_size, config.hop_size);
    if n_frames == 0 {
        return Vec::new();
    }

    let window = windowing::hann(config.frame_size);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(config.frame_size);
    let bins = config.frame_size / 2 + 1;

    let mut envelope = Vec::with_capacity(n_frames);
    let mut previous: Option<Vec<f32>> = None;
    let mut buf: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); config.frame_size];

    for frame in 0..n_frames {
        let start = frame * config.hop_size;
        for (slot, (&s, &w)) in buf
            .iter_mut()
            .zip(samples[start..start + config.frame_size].iter().zip(window.iter()))
        {
            *slot = Complex::new(s * w, 0.0);
        }
        fft.process(&mut buf);

        let magnitudes: Vec<f32> = buf[..bins].iter().map(|c| c.norm()).collect();

        let flux = match &previous {
            Some(prev) => magnitudes
                .iter()
                .zip(prev.iter())
                .map(|(&m, &p)| (m - p).max(0.0))
                .sum(),
            None => 0.0,
        };
        envelope.push(flux);
        previous = Some(magnitudes);
    }

    let peak = envelope.iter().copied().fold(0.0_f32, f32::max);
    if peak > 0.0 {
        for v in envelope.iter_mut() {
            *v /= peak;
        }
    }

    envelope
}

/// Pick onset times (seconds) from an envelope.
///
/// A frame is an onset when it is the largest value within one analysis
/// frame's span on either side, sits more than `delta` above the envelope
/// mean, and comes at least `min_gap_ms` (and never less than one frame
/// length) after the previous onset.
///
/// Times are frame centres.
pub fn pick_onsets(envelope: &[f32], sample_rate: u32, config: &OnsetConfig) -> Vec<f32> {
    if envelope.len() < 3 || sample_rate == 0 || config.hop_size == 0 {
        return Vec::new();
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let threshold = mean + config.delta;
    let sr = sample_rate as f32;
    let frame_secs = config.hop_size as f32 / sr;
    let reach = config.frame_size.div_ceil(config.hop_size).max(1);
    let min_gap_frames = (((config.min_gap_ms / 1000.0) / frame_secs).ceil() as usize).max(reach);

    let mut onsets = Vec::new();
    let mut last: Option<usize> = None;

    for (i, &v) in envelope.iter().enumerate() {
        if v <= threshold || !is_local_max(envelope, i, reach) {
            continue;
        }
        if let Some(prev) = last {
            if i - prev < min_gap_frames {
                continue;
            }
        }
        onsets.push(frame_center_secs(i, sr, config));
        last = Some(i);
    }

    onsets
}

/// True when `envelope[i]` beats everything up to `reach` frames before it
/// and is not exceeded up to `reach` frames after it.
fn is_local_max(envelope: &[f32], i: usize, reach: usize) -> bool {
    let v = envelope[i];
    let lo = i.saturating_sub(reach);
    let hi = (i + reach + 1).min(envelope.len());
    envelope[lo..i].iter().all(|&w| w < v) && envelope[i + 1..hi].iter().all(|&w| w <= v)
}

fn frame_center_secs(frame: usize, sample_rate: f32, config: &OnsetConfig) -> f32 {
    (frame * config.hop_size + config.frame_size / 2) as f32 / sample_rate
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Short 440 Hz bursts every `period_secs`, silence in between.
    pub(crate) fn burst_train(sample_rate: u32, period_secs: f32, duration_secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * duration_secs) as usize;
        let period = (period_secs * sample_rate as f32) as usize;
        let burst = (0.05 * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                if i % period < burst {
                    let t = i as f32 / sample_rate as f32;
                    (2.0 * PI * 440.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn envelope_is_normalized() {
        let samples = burst_train(22050, 0.5, 3.0);
        let env = onset_envelope(&samples, &OnsetConfig::default());
        assert!(!env.is_empty());
        let max = env.iter().copied().fold(0.0_f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(env.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn silence_has_flat_envelope() {
        let env = onset_envelope(&vec![0.0; 22050], &OnsetConfig::default());
        assert!(env.iter().all(|&v| v == 0.0));
        assert!(pick_onsets(&env, 22050, &OnsetConfig::default()).is_empty());
    }

    #[test]
    fn short_input_has_no_frames() {
        assert!(onset_envelope(&[0.5; 100], &OnsetConfig::default()).is_empty());
    }

    #[test]
    fn finds_one_onset_per_burst() {
        let samples = burst_train(22050, 0.5, 4.0);
        let config = OnsetConfig::default();
        let env = onset_envelope(&samples, &config);
        let onsets = pick_onsets(&env, 22050, &config);

        // 8 bursts; the one at t=0 has no previous frame to rise from.
        assert!(
            (7..=8).contains(&onsets.len()),
            "expected 7-8 onsets, got {}: {onsets:?}",
            onsets.len()
        );
        for pair in onsets.windows(2) {
            assert!(
                (pair[1] - pair[0] - 0.5).abs() < 0.1,
                "onsets {:.3} and {:.3} are not one burst apart",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn onsets_land_near_burst_starts() {
        let samples = burst_train(22050, 0.5, 4.0);
        let config = OnsetConfig::default();
        let onsets = pick_onsets(&onset_envelope(&samples, &config), 22050, &config);

        for t in onsets {
            let nearest = (t / 0.5).round() * 0.5;
            assert!((t - nearest).abs() < 0.08, "onset at {t:.3}s, burst at {nearest:.1}s");
        }
    }

    #[test]
    fn attack_shoulder_is_not_a_second_onset() {
        // Two local maxima three frames apart, as a burst entering the window
        // produces. The smaller one belongs to the same attack.
        let env = vec![0.0, 0.0, 0.8, 0.3, 0.4, 1.0, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0];
        let onsets = pick_onsets(&env, 22050, &OnsetConfig::default());
        assert_eq!(onsets.len(), 1);
        assert!((onsets[0] - frame_center_secs(5, 22050.0, &OnsetConfig::default())).abs() < 1e-6);
    }

    #[test]
    fn separate_attacks_are_kept() {
        let mut env = vec![0.0; 30];
        env[5] = 1.0;
        env[15] = 0.9;
        env[25] = 0.8;
        let onsets = pick_onsets(&env, 22050, &OnsetConfig::default());
        assert_eq!(onsets.len(), 3);
    }

    #[test]
    fn onset_times_are_frame_centres() {
        let config = OnsetConfig::default();
        let mut env = vec![0.0; 10];
        env[4] = 1.0;
        let onsets = pick_onsets(&env, 22050, &config);
        let expected = (4 * 512 + 1024) as f32 / 22050.0;
        assert_eq!(onsets, vec![expected]);
    }

    #[test]
    fn min_gap_suppresses_close_peaks() {
        let env = vec![0.0, 1.0, 0.0, 0.9, 0.0, 0.0];
        // Frame length equal to the hop, so only the gap applies.
        let config = OnsetConfig {
            frame_size: 512,
            hop_size: 512,
            min_gap_ms: 100.0,
            ..OnsetConfig::default()
        };
        // Frames are ~23 ms apart at 22050 Hz, so the second peak is too close.
        let onsets = pick_onsets(&env, 22050, &config);
        assert_eq!(onsets.len(), 1);
    }
}
