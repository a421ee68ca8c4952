use serde::{Deserialize, Serialize};

use super::pitch::midi_to_note_name;

/// Velocity used when no loudness signal is wired into segmentation.
pub const DEFAULT_VELOCITY: u8 = 80;

/// One point of the segmentation input: a frame time and its MIDI pitch.
/// A pitch of 0.0 (or below) means the frame is unvoiced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchPoint {
    pub time: f32,
    pub pitch: f32,
}

impl PitchPoint {
    pub fn new(time: f32, pitch: f32) -> Self {
        Self { time, pitch }
    }

    pub fn is_voiced(&self) -> bool {
        self.pitch > 0.0
    }
}

/// A discrete note produced by the segmentation engine.
///
/// `pitch` is a MIDI pitch number, already rounded to a whole semitone.
/// Times are seconds from the start of the recording, `start_time < end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: f32,
    pub start_time: f32,
    pub end_time: f32,
    pub velocity: u8,
}

impl Note {
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }

    /// MIDI key number clamped into the 0-127 range.
    pub fn midi_key(&self) -> u8 {
        self.pitch.round().clamp(0.0, 127.0) as u8
    }

    /// Scientific pitch name ("C4", "F#3").
    pub fn name(&self) -> String {
        midi_to_note_name(self.pitch)
    }
}
