use anyhow::Result;

use super::onset::{self, OnsetConfig};
use crate::transcription::track::{TempoEstimate, TempoEstimator};

/// Among autocorrelation peaks, the shortest lag reaching this fraction of
/// the strongest one wins. Keeps 120 BPM material from reading as 60.
const OCTAVE_PREFERENCE: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct TempoConfig {
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Returned whenever the signal has no usable periodicity.
    pub fallback_bpm: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 180.0,
            fallback_bpm: 120.0,
        }
    }
}

/// Tempo from the autocorrelation of the spectral-flux onset envelope.
pub struct AutocorrelationTempo {
    pub tempo: TempoConfig,
    pub onsets: OnsetConfig,
}

impl AutocorrelationTempo {
    pub fn new(tempo: TempoConfig, onsets: OnsetConfig) -> Self {
        Self { tempo, onsets }
    }
}

impl TempoEstimator for AutocorrelationTempo {
    fn estimate_tempo(&self, samples: &[f32], sample_rate: u32) -> Result<TempoEstimate> {
        if sample_rate == 0 {
            anyhow::bail!("Sample rate must be positive");
        }

        let envelope = onset::onset_envelope(samples, &self.onsets);
        let onset_times = onset::pick_onsets(&envelope, sample_rate, &self.onsets);

        let bpm = match bpm_from_envelope(&envelope, sample_rate, self.onsets.hop_size, &self.tempo)
        {
            Some(bpm) => bpm,
            None => {
                log::warn!(
                    "Tempo detection inconclusive, using {:.0} BPM",
                    self.tempo.fallback_bpm
                );
                self.tempo.fallback_bpm
            }
        };

        Ok(TempoEstimate { bpm, onset_times })
    }
}

/// Estimate BPM from an onset envelope, or `None` when there is no clear
/// periodicity in the allowed range.
///
/// 1. Remove the mean so silence and sustained energy don't correlate.
/// 2. Autocorrelate over lags covering [min_bpm, max_bpm].
/// 3. Take the shortest local peak close to the strongest one.
/// 4. Refine the lag with a parabola through the peak and its neighbors.
/// 5. BPM = 60 * sample_rate / (lag * hop).
pub fn bpm_from_envelope(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    config: &TempoConfig,
) -> Option<f32> {
    if hop_size == 0 || sample_rate == 0 || config.min_bpm <= 0.0 || config.max_bpm <= 0.0 {
        return None;
    }

    let frames_per_minute = 60.0 * sample_rate as f32 / hop_size as f32;
    let min_lag = ((frames_per_minute / config.max_bpm).floor() as usize).max(1);
    let max_lag = (frames_per_minute / config.min_bpm).ceil() as usize;

    // Need at least two full periods of the slowest tempo
    if envelope.len() < 2 * max_lag + 1 {
        return None;
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|&v| v - mean).collect();

    // One extra lag on each side so edge lags can still be local peaks
    let lo = min_lag.saturating_sub(1).max(1);
    let hi = max_lag + 1;
    let acf: Vec<f32> = (lo..=hi).map(|lag| autocorrelation(&centered, lag)).collect();
    let at = |lag: usize| acf[lag - lo];

    let peaks: Vec<usize> = (min_lag.max(lo + 1)..=max_lag)
        .filter(|&lag| at(lag) > 0.0 && at(lag) >= at(lag - 1) && at(lag) >= at(lag + 1))
        .collect();

    let strongest = peaks
        .iter()
        .map(|&lag| at(lag))
        .fold(0.0_f32, f32::max);
    if strongest <= 0.0 {
        return None;
    }

    let best = *peaks
        .iter()
        .find(|&&lag| at(lag) >= OCTAVE_PREFERENCE * strongest)?;

    let refined = best as f32 + parabolic_offset(at(best - 1), at(best), at(best + 1));
    let bpm = frames_per_minute / refined;

    log::debug!("Tempo: lag {best} (refined {refined:.2}) → {bpm:.1} BPM");

    Some(bpm.clamp(config.min_bpm, config.max_bpm))
}

/// Sum of x[n] * x[n + lag].
fn autocorrelation(signal: &[f32], lag: usize) -> f32 {
    if lag >= signal.len() {
        return 0.0;
    }
    signal
        .iter()
        .zip(signal[lag..].iter())
        .map(|(&a, &b)| a * b)
        .sum()
}

/// Vertex offset of the parabola through three equally spaced points,
/// in [-0.5, 0.5].
fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let denom = left - 2.0 * center + right;
    if denom.abs() < 1e-12 {
        return 0.0;
    }
    (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::onset::tests::burst_train;

    /// 16 kHz with a 500-sample hop gives 32 frames per second, so
    /// 120 BPM is exactly 16 frames.
    fn exact_grid() -> OnsetConfig {
        OnsetConfig {
            frame_size: 1024,
            hop_size: 500,
            ..OnsetConfig::default()
        }
    }

    #[test]
    fn detects_120_bpm_bursts() {
        let samples = burst_train(16000, 0.5, 10.0);
        let estimator = AutocorrelationTempo::new(TempoConfig::default(), exact_grid());
        let estimate = estimator.estimate_tempo(&samples, 16000).unwrap();
        assert!(
            (estimate.bpm - 120.0).abs() < 4.0,
            "expected ~120 BPM, got {:.1}",
            estimate.bpm
        );
        assert!(!estimate.onset_times.is_empty());
    }

    #[test]
    fn detects_90_bpm_bursts() {
        let samples = burst_train(16000, 60.0 / 90.0, 12.0);
        let estimator = AutocorrelationTempo::new(TempoConfig::default(), exact_grid());
        let bpm = estimator.estimate_tempo(&samples, 16000).unwrap().bpm;
        assert!((bpm - 90.0).abs() < 4.0, "expected ~90 BPM, got {bpm:.1}");
    }

    #[test]
    fn silence_falls_back() {
        let estimator = AutocorrelationTempo::new(TempoConfig::default(), exact_grid());
        let estimate = estimator.estimate_tempo(&vec![0.0; 16000 * 5], 16000).unwrap();
        assert_eq!(estimate.bpm, 120.0);
    }

    #[test]
    fn short_audio_falls_back() {
        let estimator = AutocorrelationTempo::new(
            TempoConfig {
                fallback_bpm: 100.0,
                ..TempoConfig::default()
            },
            exact_grid(),
        );
        let samples = burst_train(16000, 0.5, 1.0);
        assert_eq!(estimator.estimate_tempo(&samples, 16000).unwrap().bpm, 100.0);
    }

    #[test]
    fn envelope_with_exact_period() {
        // Impulse every 16 frames at 32 frames/s → 120 BPM
        let envelope: Vec<f32> = (0..320).map(|i| if i % 16 == 0 { 1.0 } else { 0.0 }).collect();
        let bpm = bpm_from_envelope(&envelope, 16000, 500, &TempoConfig::default()).unwrap();
        assert!((bpm - 120.0).abs() < 0.5, "got {bpm}");
    }

    #[test]
    fn flat_envelope_is_inconclusive() {
        let envelope = vec![0.3; 400];
        assert!(bpm_from_envelope(&envelope, 16000, 500, &TempoConfig::default()).is_none());
    }

    #[test]
    fn parabola_vertex() {
        assert_eq!(parabolic_offset(1.0, 2.0, 1.0), 0.0);
        assert!(parabolic_offset(1.0, 2.0, 1.5) > 0.0);
        assert!(parabolic_offset(1.5, 2.0, 1.0) < 0.0);
    }

    #[test]
    fn zero_sample_rate_is_an_error() {
        let estimator = AutocorrelationTempo::new(TempoConfig::default(), OnsetConfig::default());
        assert!(estimator.estimate_tempo(&[0.0; 10], 0).is_err());
    }
}
