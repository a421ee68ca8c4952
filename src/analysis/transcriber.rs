use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dsp::loudness;
use crate::transcription::note::{Note, PitchPoint};
use crate::transcription::score::{layout, ScoreEvent};
use crate::transcription::segment::{
    segment_notes, segment_notes_with_loudness, SegmentationConfig, VelocityMode,
};
use crate::transcription::stats::{transcription_stats, TranscriptionStats};
use crate::transcription::track::{
    to_pitch_points, voiced_fraction, PitchTrackProvider, TempoEstimator,
};

/// Everything the renderers need about one transcribed recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub notes: Vec<Note>,
    pub tempo_bpm: f32,
    pub stats: TranscriptionStats,
    pub frame_count: usize,
    pub voiced_frames: usize,
    pub onset_count: usize,
}

impl Transcription {
    /// Wrap an existing note list, computing its statistics.
    pub fn from_notes(notes: Vec<Note>, tempo_bpm: f32) -> Self {
        let stats = transcription_stats(&notes);
        Self {
            notes,
            tempo_bpm,
            stats,
            frame_count: 0,
            voiced_frames: 0,
            onset_count: 0,
        }
    }

    /// Notes and gap rests in score order, each with its duration class.
    pub fn events(&self) -> Vec<ScoreEvent> {
        layout(&self.notes, self.tempo_bpm)
    }
}

/// Runs a pitch tracker and a tempo estimator over audio and segments the
/// result into notes.
pub struct Transcriber<'a, P, T> {
    pitch: P,
    tempo: T,
    config: &'a SegmentationConfig,
}

impl<'a, P, T> Transcriber<'a, P, T>
where
    P: PitchTrackProvider,
    T: TempoEstimator,
{
    pub fn new(pitch: P, tempo: T, config: &'a SegmentationConfig) -> Self {
        Self {
            pitch,
            tempo,
            config,
        }
    }

    /// The pitch track with low-confidence frames zeroed, in MIDI pitch.
    pub fn masked_track(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<PitchPoint>> {
        let frames = self
            .pitch
            .pitch_track(samples, sample_rate)
            .context("Pitch tracking failed")?;
        log::debug!(
            "{:.0}% of {} frames voiced before confidence masking",
            voiced_fraction(&frames) * 100.0,
            frames.len()
        );
        Ok(to_pitch_points(&frames, self.config.confidence_threshold))
    }

    pub fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Transcription> {
        if samples.is_empty() {
            anyhow::bail!("No audio samples to transcribe");
        }

        let points = self.masked_track(samples, sample_rate)?;
        let voiced_frames = points.iter().filter(|p| p.is_voiced()).count();
        log::info!(
            "Pitch track: {} frames, {} voiced",
            points.len(),
            voiced_frames
        );

        let tempo = self
            .tempo
            .estimate_tempo(samples, sample_rate)
            .context("Tempo estimation failed")?;
        log::info!(
            "Tempo: {:.1} BPM ({} onsets)",
            tempo.bpm,
            tempo.onset_times.len()
        );

        let notes = match self.config.velocity_mode {
            VelocityMode::Fixed => segment_notes(&points, self.config)?,
            VelocityMode::Loudness => {
                let times: Vec<f32> = points.iter().map(|p| p.time).collect();
                let window = self.pitch.window_samples(sample_rate);
                let levels = loudness::frame_loudness(samples, sample_rate, &times, window);
                segment_notes_with_loudness(&points, &levels, self.config)?
            }
        };
        log::info!("Segmented {} notes", notes.len());

        Ok(Transcription {
            frame_count: points.len(),
            voiced_frames,
            onset_count: tempo.onset_times.len(),
            ..Transcription::from_notes(notes, tempo.bpm)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::pitch::midi_to_hz;
    use crate::transcription::quantize::DurationClass;
    use crate::transcription::track::{FixedTempo, PitchFrame};

    const HOP: f32 = 0.0625;

    /// Replays a prepared track regardless of the audio it is given.
    struct ScriptedTrack {
        frames: Vec<PitchFrame>,
    }

    impl PitchTrackProvider for ScriptedTrack {
        fn pitch_track(&self, _samples: &[f32], _sample_rate: u32) -> Result<Vec<PitchFrame>> {
            Ok(self.frames.clone())
        }

        fn hop_seconds(&self) -> f32 {
            HOP
        }
    }

    struct FailingTrack;

    impl PitchTrackProvider for FailingTrack {
        fn pitch_track(&self, _samples: &[f32], _sample_rate: u32) -> Result<Vec<PitchFrame>> {
            anyhow::bail!("detector exploded")
        }

        fn hop_seconds(&self) -> f32 {
            HOP
        }
    }

    /// Eight frames per pitch, full confidence.
    fn scale_track(pitches: &[f32]) -> ScriptedTrack {
        let frames = pitches
            .iter()
            .flat_map(|&p| std::iter::repeat(p).take(8))
            .enumerate()
            .map(|(i, p)| PitchFrame {
                time: i as f32 * HOP,
                frequency_hz: midi_to_hz(p),
                confidence: 0.9,
            })
            .collect();
        ScriptedTrack { frames }
    }

    #[test]
    fn c_major_scale_end_to_end() {
        let pitches = [60.0, 62.0, 64.0, 65.0, 67.0, 69.0, 71.0, 72.0];
        let config = SegmentationConfig::default();
        let transcriber = Transcriber::new(scale_track(&pitches), FixedTempo(120.0), &config);

        let result = transcriber.transcribe(&[0.0; 100], 16000).unwrap();

        let keys: Vec<u8> = result.notes.iter().map(|n| n.midi_key()).collect();
        assert_eq!(keys, vec![60, 62, 64, 65, 67, 69, 71, 72]);
        assert_eq!(result.tempo_bpm, 120.0);
        assert_eq!(result.frame_count, 64);
        assert_eq!(result.voiced_frames, 64);
        assert_eq!(result.stats.total_notes, 8);

        let events = result.events();
        assert_eq!(events.len(), 8, "no rests between contiguous notes");
        assert!(events.iter().all(|e| e.duration() == DurationClass::Quarter));
    }

    #[test]
    fn low_confidence_frames_are_masked() {
        let mut track = scale_track(&[60.0]);
        for frame in &mut track.frames {
            frame.confidence = 0.1;
        }
        let config = SegmentationConfig::default();
        let transcriber = Transcriber::new(track, FixedTempo(120.0), &config);

        let result = transcriber.transcribe(&[0.0; 100], 16000).unwrap();
        assert_eq!(result.voiced_frames, 0);
        assert!(result.notes.is_empty());
        assert_eq!(result.events().len(), 1, "one whole rest");
    }

    #[test]
    fn loudness_mode_sets_velocity_from_audio() {
        let config = SegmentationConfig {
            velocity_mode: VelocityMode::Loudness,
            ..SegmentationConfig::default()
        };
        // 16 kHz, 8 frames at 62.5 ms = 0.5 s of full-scale square wave
        let samples: Vec<f32> = (0..8000)
            .map(|i| if (i / 20) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let transcriber = Transcriber::new(scale_track(&[69.0]), FixedTempo(120.0), &config);

        let result = transcriber.transcribe(&samples, 16000).unwrap();
        assert_eq!(result.notes.len(), 1);
        assert!(result.notes[0].velocity > 120, "full scale should be loud");
    }

    #[test]
    fn empty_audio_is_an_error() {
        let config = SegmentationConfig::default();
        let transcriber = Transcriber::new(scale_track(&[60.0]), FixedTempo(120.0), &config);
        assert!(transcriber.transcribe(&[], 16000).is_err());
    }

    #[test]
    fn provider_errors_propagate() {
        let config = SegmentationConfig::default();
        let transcriber = Transcriber::new(FailingTrack, FixedTempo(120.0), &config);
        let err = transcriber.transcribe(&[0.0; 10], 16000).unwrap_err();
        assert!(format!("{err:#}").contains("detector exploded"));
    }

    #[test]
    fn bad_fixed_tempo_is_an_error() {
        let config = SegmentationConfig::default();
        let transcriber = Transcriber::new(scale_track(&[60.0]), FixedTempo(0.0), &config);
        assert!(transcriber.transcribe(&[0.0; 10], 16000).is_err());
    }
}
