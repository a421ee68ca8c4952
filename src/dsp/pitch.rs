use anyhow::Result;
use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use super::windowing;
use crate::transcription::track::{PitchFrame, PitchTrackProvider};

/// Configuration for pitch extraction.
#[derive(Debug, Clone)]
pub struct PitchConfig {
    /// Minimum detectable frequency in Hz. C2 is the bottom of most
    /// melodic material worth notating.
    pub pitch_floor_hz: f32,

    /// Maximum detectable frequency in Hz (C7).
    pub pitch_ceiling_hz: f32,

    /// Analysis window duration in milliseconds.
    pub frame_size_ms: f32,

    /// How far to advance between frames, in milliseconds.
    pub hop_size_ms: f32,

    /// McLeod power threshold — filters out low-energy frames (noise).
    pub power_threshold: f64,

    /// McLeod clarity threshold — how "confident" the detector must be
    /// before it reports a pitch at all. Range 0.0-1.0.
    pub clarity_threshold: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            pitch_floor_hz: 65.4,
            pitch_ceiling_hz: 2093.0,
            frame_size_ms: 46.0,
            hop_size_ms: 11.6,
            power_threshold: 0.2,
            clarity_threshold: 0.2,
        }
    }
}

/// Pitch tracker built on the McLeod Pitch Method.
///
/// McLeod computes a normalized autocorrelation of each frame and picks the
/// first strong peak as the period. Its "clarity" (peak height, 0-1) is what
/// we report as the frame confidence.
pub struct McLeodTracker {
    config: PitchConfig,
}

impl McLeodTracker {
    pub fn new(config: PitchConfig) -> Self {
        Self { config }
    }
}

impl PitchTrackProvider for McLeodTracker {
    fn pitch_track(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<PitchFrame>> {
        if sample_rate == 0 {
            anyhow::bail!("Sample rate must be positive");
        }
        Ok(extract_pitch_track(samples, sample_rate, &self.config))
    }

    fn hop_seconds(&self) -> f32 {
        self.config.hop_size_ms / 1000.0
    }

    fn window_samples(&self, sample_rate: u32) -> usize {
        detector_size(sample_rate, &self.config)
    }
}

/// Number of samples the detector looks at per frame.
///
/// It needs at least two full cycles of the lowest frequency we accept,
/// rounded up to a power of two for the FFT inside the detector.
pub fn detector_size(sample_rate: u32, config: &PitchConfig) -> usize {
    let sr = sample_rate as f32;
    let frame_size = (config.frame_size_ms / 1000.0 * sr) as usize;
    let min_buffer = (2.0 * sr / config.pitch_floor_hz).ceil() as usize;
    min_buffer.next_power_of_two().max(frame_size)
}

/// Hop length in samples (at least one).
pub fn hop_samples(sample_rate: u32, config: &PitchConfig) -> usize {
    ((config.hop_size_ms / 1000.0 * sample_rate as f32) as usize).max(1)
}

/// Slide a window across the audio and run the McLeod detector on each frame.
/// Each frame is stamped with the time of its window centre.
///
/// Frames without a detection, or with a frequency outside
/// [floor, ceiling], come back as unvoiced (0 Hz, confidence 0).
pub fn extract_pitch_track(
    samples: &[f32],
    sample_rate: u32,
    config: &PitchConfig,
) -> Vec<PitchFrame> {
    let sr = sample_rate as f32;
    let size = detector_size(sample_rate, config);
    let hop = hop_samples(sample_rate, config);
    let padding = size / 2;

    let mut detector = McLeodDetector::new(size, padding);
    let mut track = Vec::new();
    let mut pos = 0;

    while pos + size <= samples.len() {
        let time = (pos + size / 2) as f32 / sr;

        let windowed = windowing::hanning(&samples[pos..pos + size]);
        let signal: Vec<f64> = windowed.iter().map(|&s| s as f64).collect();

        let detected = detector
            .get_pitch(
                &signal,
                sample_rate as usize,
                config.power_threshold,
                config.clarity_threshold,
            )
            .map(|p| (p.frequency as f32, p.clarity as f32))
            .filter(|&(f, _)| f >= config.pitch_floor_hz && f <= config.pitch_ceiling_hz);

        let (frequency_hz, confidence) = detected.unwrap_or((0.0, 0.0));
        track.push(PitchFrame {
            time,
            frequency_hz,
            confidence: confidence.clamp(0.0, 1.0),
        });

        pos += hop;
    }

    log::debug!(
        "Pitch track: {} frames, detector size {size}, hop {hop}",
        track.len()
    );

    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::track::voiced_fraction;
    use std::f32::consts::PI;

    fn sine_wave(freq_hz: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI * freq_hz * t).sin()
            })
            .collect()
    }

    fn voiced_hz(track: &[PitchFrame]) -> Vec<f32> {
        track
            .iter()
            .filter(|f| f.frequency_hz > 0.0)
            .map(|f| f.frequency_hz)
            .collect()
    }

    #[test]
    fn detects_a440() {
        let samples = sine_wave(440.0, 22050, 0.5);
        let track = extract_pitch_track(&samples, 22050, &PitchConfig::default());

        let hz = voiced_hz(&track);
        assert!(!hz.is_empty(), "Should detect pitch in a pure sine wave");
        let mean = hz.iter().sum::<f32>() / hz.len() as f32;
        assert!((mean - 440.0).abs() < 5.0, "Mean pitch should be ~440 Hz, got {mean:.1}");
    }

    #[test]
    fn detects_low_c() {
        let samples = sine_wave(130.8, 22050, 1.0);
        let track = extract_pitch_track(&samples, 22050, &PitchConfig::default());

        let hz = voiced_hz(&track);
        assert!(!hz.is_empty());
        let mean = hz.iter().sum::<f32>() / hz.len() as f32;
        assert!((mean - 130.8).abs() < 4.0, "got {mean:.1}");
    }

    #[test]
    fn voiced_frames_carry_confidence() {
        let samples = sine_wave(440.0, 22050, 0.5);
        let track = extract_pitch_track(&samples, 22050, &PitchConfig::default());
        for f in track.iter().filter(|f| f.frequency_hz > 0.0) {
            assert!(f.confidence > 0.5, "clean sine should be clear, got {}", f.confidence);
        }
    }

    #[test]
    fn silence_is_unvoiced() {
        let samples = vec![0.0; 22050];
        let track = extract_pitch_track(&samples, 22050, &PitchConfig::default());
        let vf = voiced_fraction(&track);
        assert!(vf < 0.1, "Silence should be mostly unvoiced, got {vf:.2}");
    }

    #[test]
    fn too_short_input_gives_empty_track() {
        let track = extract_pitch_track(&[0.1; 16], 22050, &PitchConfig::default());
        assert!(track.is_empty());
    }

    #[test]
    fn timestamps_step_by_hop() {
        let samples = sine_wave(220.0, 22050, 0.5);
        let config = PitchConfig::default();
        let track = extract_pitch_track(&samples, 22050, &config);
        let hop = hop_samples(22050, &config) as f32 / 22050.0;

        for pair in track.windows(2) {
            assert!(((pair[1].time - pair[0].time) - hop).abs() < 1e-4);
        }
    }

    #[test]
    fn frames_are_stamped_at_window_centre() {
        let samples = sine_wave(220.0, 22050, 0.5);
        let config = PitchConfig::default();
        let track = extract_pitch_track(&samples, 22050, &config);
        let size = detector_size(22050, &config);
        let hop = hop_samples(22050, &config);

        assert_eq!(track[0].time, (size / 2) as f32 / 22050.0);
        assert_eq!(track[1].time, (hop + size / 2) as f32 / 22050.0);
    }

    #[test]
    fn detector_covers_two_periods_of_floor() {
        let config = PitchConfig::default();
        let size = detector_size(22050, &config);
        let two_periods = 2.0 * 22050.0 / config.pitch_floor_hz;
        assert!(size as f32 >= two_periods);
        assert!(size.is_power_of_two() || size == (config.frame_size_ms / 1000.0 * 22050.0) as usize);
    }

    #[test]
    fn provider_rejects_zero_sample_rate() {
        let tracker = McLeodTracker::new(PitchConfig::default());
        assert!(tracker.pitch_track(&[0.0; 4096], 0).is_err());
    }
}
