use serde::{Deserialize, Serialize};

use super::note::Note;
use super::quantize::{quantize_duration, DurationClass};

/// One entry in the notated part: a sounding note or a rest filling a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScoreEvent {
    Note {
        note: Note,
        duration: DurationClass,
    },
    Rest {
        start_time: f32,
        end_time: f32,
        duration: DurationClass,
    },
}

impl ScoreEvent {
    pub fn duration(&self) -> DurationClass {
        match self {
            ScoreEvent::Note { duration, .. } | ScoreEvent::Rest { duration, .. } => *duration,
        }
    }

    pub fn start_time(&self) -> f32 {
        match self {
            ScoreEvent::Note { note, .. } => note.start_time,
            ScoreEvent::Rest { start_time, .. } => *start_time,
        }
    }

    pub fn end_time(&self) -> f32 {
        match self {
            ScoreEvent::Note { note, .. } => note.end_time,
            ScoreEvent::Rest { end_time, .. } => *end_time,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, ScoreEvent::Rest { .. })
    }
}

/// Lay notes out as a single voice, filling gaps with rests.
///
/// A cursor starts at time zero. Whenever the next note starts after the
/// cursor, the gap becomes a rest. Every note and rest gets its own
/// quantized duration. With no notes at all the part is one whole rest.
pub fn layout(notes: &[Note], bpm: f32) -> Vec<ScoreEvent> {
    if notes.is_empty() {
        return vec![ScoreEvent::Rest {
            start_time: 0.0,
            end_time: 0.0,
            duration: DurationClass::Whole,
        }];
    }

    let mut sorted: Vec<&Note> = notes.iter().collect();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut events = Vec::with_capacity(sorted.len() * 2);
    let mut cursor = 0.0_f32;

    for note in sorted {
        if note.start_time > cursor {
            events.push(ScoreEvent::Rest {
                start_time: cursor,
                end_time: note.start_time,
                duration: quantize_duration(note.start_time - cursor, bpm),
            });
        }

        events.push(ScoreEvent::Note {
            note: note.clone(),
            duration: quantize_duration(note.duration(), bpm),
        });
        cursor = note.end_time;
    }

    events
}
