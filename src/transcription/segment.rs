use serde::{Deserialize, Serialize};

use super::error::SegmentError;
use super::note::{Note, PitchPoint, DEFAULT_VELOCITY};

/// Tunables for turning a pitch track into notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Voiced runs shorter than this (seconds) are dropped as tracker noise.
    pub min_note_duration: f32,

    /// A jump of this many semitones or more between consecutive frames
    /// ends the current note and starts a new one.
    pub semitone_threshold: f32,

    /// Velocity given to notes when no loudness series is supplied.
    pub default_velocity: u8,

    /// Whether velocity comes from the fixed default or from frame loudness.
    pub velocity_mode: VelocityMode,

    /// Pitch frames with a confidence below this are treated as unvoiced.
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityMode {
    Fixed,
    Loudness,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_note_duration: 0.1,
            semitone_threshold: 1.0,
            default_velocity: DEFAULT_VELOCITY,
            velocity_mode: VelocityMode::Fixed,
            confidence_threshold: 0.3,
        }
    }
}

/// A finished run of frames: indices are `[start_index, end_index)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedRun {
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: f32,
    pub end_time: f32,
}

impl ClosedRun {
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }
}

/// Scanner state. `boundary_pitch` is the pitch of the most recent frame in
/// the run; continuity is judged frame to frame against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunState {
    Idle,
    InRun {
        start_index: usize,
        start_time: f32,
        boundary_pitch: f32,
    },
}

/// The whole state machine: given the current state and the next frame,
/// return the next state and the run that this frame closed, if any.
pub fn transition(
    state: RunState,
    index: usize,
    point: PitchPoint,
    semitone_threshold: f32,
) -> (RunState, Option<ClosedRun>) {
    let open_here = || RunState::InRun {
        start_index: index,
        start_time: point.time,
        boundary_pitch: point.pitch,
    };

    match state {
        RunState::Idle if point.is_voiced() => (open_here(), None),
        RunState::Idle => (RunState::Idle, None),

        RunState::InRun {
            start_index,
            start_time,
            boundary_pitch,
        } => {
            let changed = (point.pitch - boundary_pitch).abs() >= semitone_threshold;

            if point.is_voiced() && !changed {
                let next = RunState::InRun {
                    start_index,
                    start_time,
                    boundary_pitch: point.pitch,
                };
                return (next, None);
            }

            let closed = ClosedRun {
                start_index,
                end_index: index,
                start_time,
                end_time: point.time,
            };
            let next = if point.is_voiced() {
                open_here()
            } else {
                RunState::Idle
            };
            (next, Some(closed))
        }
    }
}

/// Drives `transition` over a track and flushes the open run at the end.
#[derive(Debug)]
pub struct RunTracker {
    state: RunState,
    semitone_threshold: f32,
}

impl RunTracker {
    pub fn new(semitone_threshold: f32) -> Self {
        Self {
            state: RunState::Idle,
            semitone_threshold,
        }
    }

    pub fn step(&mut self, index: usize, point: PitchPoint) -> Option<ClosedRun> {
        let (next, closed) = transition(self.state, index, point, self.semitone_threshold);
        self.state = next;
        closed
    }

    /// Close whatever run is still open, ending it at `end_time`.
    pub fn finish(self, end_index: usize, end_time: f32) -> Option<ClosedRun> {
        match self.state {
            RunState::Idle => None,
            RunState::InRun {
                start_index,
                start_time,
                ..
            } => Some(ClosedRun {
                start_index,
                end_index,
                start_time,
                end_time,
            }),
        }
    }
}

/// Segment a pitch track into notes with the fixed default velocity.
///
/// The track must be ordered by strictly increasing time; unvoiced frames
/// carry pitch 0. An empty track gives an empty note list.
pub fn segment_notes(
    points: &[PitchPoint],
    config: &SegmentationConfig,
) -> Result<Vec<Note>, SegmentError> {
    segment(points, None, config)
}

/// Same as `segment_notes`, but each note's velocity is derived from the mean
/// of `loudness` (one value in [0, 1] per frame) over the note's frames.
pub fn segment_notes_with_loudness(
    points: &[PitchPoint],
    loudness: &[f32],
    config: &SegmentationConfig,
) -> Result<Vec<Note>, SegmentError> {
    if loudness.len() != points.len() {
        return Err(SegmentError::LoudnessLengthMismatch {
            frames: points.len(),
            loudness: loudness.len(),
        });
    }
    segment(points, Some(loudness), config)
}

fn segment(
    points: &[PitchPoint],
    loudness: Option<&[f32]>,
    config: &SegmentationConfig,
) -> Result<Vec<Note>, SegmentError> {
    validate_track(points)?;

    let mut tracker = RunTracker::new(config.semitone_threshold);
    let mut notes = Vec::new();

    for (i, &point) in points.iter().enumerate() {
        if let Some(run) = tracker.step(i, point) {
            notes.extend(close_run(&run, points, loudness, config));
        }
    }

    if let Some(last) = points.last() {
        if let Some(run) = tracker.finish(points.len(), last.time) {
            notes.extend(close_run(&run, points, loudness, config));
        }
    }

    log::debug!(
        "Segmented {} frames into {} notes",
        points.len(),
        notes.len()
    );

    Ok(notes)
}

/// Turn a closed run into a note, or drop it.
///
/// Runs shorter than the minimum duration, and runs whose mean pitch rounds
/// to zero or below, are discarded. Neither is an error.
pub fn close_run(
    run: &ClosedRun,
    points: &[PitchPoint],
    loudness: Option<&[f32]>,
    config: &SegmentationConfig,
) -> Option<Note> {
    let duration = run.duration();
    if duration < config.min_note_duration || duration <= 0.0 {
        log::debug!(
            "Dropping run at {:.3}s: {:.3}s is shorter than {:.3}s",
            run.start_time,
            duration,
            config.min_note_duration
        );
        return None;
    }

    let frames = &points[run.start_index..run.end_index];
    let mean_pitch = frames.iter().map(|p| p.pitch).sum::<f32>() / frames.len() as f32;
    let pitch = mean_pitch.round_ties_even();
    if pitch <= 0.0 {
        log::debug!(
            "Dropping run at {:.3}s: mean pitch {mean_pitch:.2} is not a note",
            run.start_time
        );
        return None;
    }

    let velocity = match loudness {
        Some(series) => loudness_velocity(&series[run.start_index..run.end_index]),
        None => config.default_velocity,
    };

    Some(Note {
        pitch,
        start_time: run.start_time,
        end_time: run.end_time,
        velocity,
    })
}

/// Mean loudness in [0, 1] scaled to a MIDI velocity in [1, 127].
fn loudness_velocity(loudness: &[f32]) -> u8 {
    if loudness.is_empty() {
        return DEFAULT_VELOCITY;
    }
    let mean = loudness.iter().sum::<f32>() / loudness.len() as f32;
    (mean * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Reject tracks the scan can't interpret: non-finite values or time that
/// stalls or runs backwards.
pub fn validate_track(points: &[PitchPoint]) -> Result<(), SegmentError> {
    let mut previous: Option<f32> = None;

    for (index, point) in points.iter().enumerate() {
        if !point.time.is_finite() {
            return Err(SegmentError::NonFiniteTime {
                index,
                time: point.time,
            });
        }
        if !point.pitch.is_finite() {
            return Err(SegmentError::NonFinitePitch {
                index,
                pitch: point.pitch,
            });
        }
        if let Some(prev) = previous {
            if point.time <= prev {
                return Err(SegmentError::NonMonotonicTime {
                    index,
                    previous: prev,
                    time: point.time,
                });
            }
        }
        previous = Some(point.time);
    }

    Ok(())
}
