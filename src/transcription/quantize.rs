use std::fmt;

use serde::{Deserialize, Serialize};

/// Standard notated durations, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationClass {
    #[serde(rename = "32nd")]
    ThirtySecond,
    #[serde(rename = "16th")]
    Sixteenth,
    #[serde(rename = "eighth")]
    Eighth,
    #[serde(rename = "quarter")]
    Quarter,
    #[serde(rename = "half")]
    Half,
    #[serde(rename = "whole")]
    Whole,
}

impl DurationClass {
    /// All classes, shortest first.
    pub const ALL: [DurationClass; 6] = [
        DurationClass::ThirtySecond,
        DurationClass::Sixteenth,
        DurationClass::Eighth,
        DurationClass::Quarter,
        DurationClass::Half,
        DurationClass::Whole,
    ];

    /// Length in beats, with a quarter note as one beat (4/4).
    pub fn beats(self) -> f32 {
        match self {
            DurationClass::ThirtySecond => 0.125,
            DurationClass::Sixteenth => 0.25,
            DurationClass::Eighth => 0.5,
            DurationClass::Quarter => 1.0,
            DurationClass::Half => 2.0,
            DurationClass::Whole => 4.0,
        }
    }

    /// Name used by MusicXML's `<type>` element and in reports.
    pub fn label(self) -> &'static str {
        match self {
            DurationClass::ThirtySecond => "32nd",
            DurationClass::Sixteenth => "16th",
            DurationClass::Eighth => "eighth",
            DurationClass::Quarter => "quarter",
            DurationClass::Half => "half",
            DurationClass::Whole => "whole",
        }
    }
}

impl fmt::Display for DurationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower bound (in beats) of each class, longest first. Each bound sits
/// halfway between a class and the next shorter one.
const LADDER: [(f32, DurationClass); 5] = [
    (3.5, DurationClass::Whole),
    (1.75, DurationClass::Half),
    (0.875, DurationClass::Quarter),
    (0.4375, DurationClass::Eighth),
    (0.21875, DurationClass::Sixteenth),
];

/// Convert seconds to beats at the given tempo.
pub fn seconds_to_beats(seconds: f32, bpm: f32) -> f32 {
    seconds * (bpm / 60.0)
}

/// Classify a duration in seconds into the nearest standard duration.
///
/// Works for notes and for rests. Never fails: anything shorter than a
/// sixteenth becomes a 32nd, anything from 3.5 beats up becomes a whole.
///
/// `bpm` must be positive. A non-positive tempo is a caller bug (tempo
/// estimators always supply a fallback) and is not corrected here.
pub fn quantize_duration(seconds: f32, bpm: f32) -> DurationClass {
    debug_assert!(bpm > 0.0, "tempo must be positive, got {bpm}");

    let beats = seconds_to_beats(seconds, bpm);
    LADDER
        .iter()
        .find(|(lower, _)| beats >= *lower)
        .map(|&(_, class)| class)
        .unwrap_or(DurationClass::ThirtySecond)
}
