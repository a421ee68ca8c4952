use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::note::PitchPoint;
use super::pitch::hz_to_midi;

/// One analysis frame from a pitch tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchFrame {
    /// Seconds from the start of the audio to the centre of the frame's
    /// analysis window.
    pub time: f32,
    /// Fundamental frequency, 0.0 when unvoiced.
    pub frequency_hz: f32,
    /// Tracker confidence in [0, 1].
    pub confidence: f32,
}

/// Anything that turns audio into a frame-by-frame pitch track.
pub trait PitchTrackProvider {
    /// Frames must come back in increasing time order at a fixed hop.
    fn pitch_track(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<PitchFrame>>;

    /// Hop between frames in seconds.
    fn hop_seconds(&self) -> f32;

    /// Samples each frame covers, centred on its timestamp.
    fn window_samples(&self, sample_rate: u32) -> usize {
        ((self.hop_seconds() * sample_rate as f32) as usize).max(1)
    }
}

/// A whole-recording tempo, plus the onsets it was derived from (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEstimate {
    pub bpm: f32,
    pub onset_times: Vec<f32>,
}

/// Anything that produces one BPM value for a recording.
///
/// Implementations must always return a positive tempo, falling back to a
/// default when detection is inconclusive.
pub trait TempoEstimator {
    fn estimate_tempo(&self, samples: &[f32], sample_rate: u32) -> Result<TempoEstimate>;
}

/// A tempo chosen up front, e.g. from the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedTempo(pub f32);

impl TempoEstimator for FixedTempo {
    fn estimate_tempo(&self, _samples: &[f32], _sample_rate: u32) -> Result<TempoEstimate> {
        if self.0 <= 0.0 || !self.0.is_finite() {
            anyhow::bail!("Tempo must be a positive number of BPM, got {}", self.0);
        }
        Ok(TempoEstimate {
            bpm: self.0,
            onset_times: Vec::new(),
        })
    }
}

/// Zero out low-confidence frames and map frequencies to MIDI pitch.
pub fn to_pitch_points(frames: &[PitchFrame], confidence_threshold: f32) -> Vec<PitchPoint> {
    frames
        .iter()
        .map(|f| {
            let pitch = if f.confidence >= confidence_threshold {
                hz_to_midi(f.frequency_hz)
            } else {
                0.0
            };
            PitchPoint::new(f.time, pitch)
        })
        .collect()
}

/// Fraction of frames with a non-zero frequency. 0.0 for an empty track.
pub fn voiced_fraction(frames: &[PitchFrame]) -> f32 {
    if frames.is_empty() {
        return 0.0;
    }
    let voiced = frames.iter().filter(|f| f.frequency_hz > 0.0).count();
    voiced as f32 / frames.len() as f32
}
