use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::note::Note;

/// Summary numbers for a note list, for logs and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionStats {
    pub total_notes: usize,
    /// Latest note end time in seconds.
    pub duration: f32,
    /// Lowest and highest pitch, `(0, 0)` when there are no notes.
    pub pitch_range: (f32, f32),
    pub average_note_duration: f32,
    pub unique_pitches: usize,
}

/// Aggregate statistics over a note list. Empty input gives all zeros.
pub fn transcription_stats(notes: &[Note]) -> TranscriptionStats {
    if notes.is_empty() {
        return TranscriptionStats {
            total_notes: 0,
            duration: 0.0,
            pitch_range: (0.0, 0.0),
            average_note_duration: 0.0,
            unique_pitches: 0,
        };
    }

    let duration = notes
        .iter()
        .map(|n| n.end_time)
        .fold(f32::NEG_INFINITY, f32::max);

    let min_pitch = notes.iter().map(|n| n.pitch).fold(f32::INFINITY, f32::min);
    let max_pitch = notes
        .iter()
        .map(|n| n.pitch)
        .fold(f32::NEG_INFINITY, f32::max);

    let average_note_duration =
        notes.iter().map(Note::duration).sum::<f32>() / notes.len() as f32;

    // Pitches are whole semitones after segmentation, so compare by key.
    let unique_pitches = notes
        .iter()
        .map(|n| n.pitch.round() as i32)
        .collect::<BTreeSet<_>>()
        .len();

    TranscriptionStats {
        total_notes: notes.len(),
        duration,
        pitch_range: (min_pitch, max_pitch),
        average_note_duration,
        unique_pitches,
    }
}
