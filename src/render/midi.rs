use std::path::Path;

use anyhow::{Context, Result};
use midly::num::{u15, u24, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use super::{OutputFormat, ScoreRenderer};
use crate::analysis::transcriber::Transcription;
use crate::transcription::note::Note;

pub const TICKS_PER_BEAT: u16 = 480;

/// Standard MIDI file (format 0) with one channel.
pub struct MidiRenderer;

impl ScoreRenderer for MidiRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Midi
    }

    fn render(&self, transcription: &Transcription, path: &Path) -> Result<()> {
        let bytes = midi_file_data(&transcription.notes, transcription.tempo_bpm)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// An event at an absolute tick, before conversion to delta times.
struct AbsoluteEvent {
    tick: u32,
    kind: TrackEventKind<'static>,
}

/// Note on/off pairs at the notes' real times, sorted by tick.
///
/// At equal ticks a NoteOff goes before a NoteOn so a repeated pitch
/// re-attacks instead of being cut off.
fn note_events(notes: &[Note], ticks_per_second: f32) -> Vec<TrackEvent<'static>> {
    let mut events: Vec<AbsoluteEvent> = Vec::with_capacity(notes.len() * 2);

    for note in notes {
        let key = u7::new(note.midi_key());
        let vel = u7::new(note.velocity.clamp(1, 127));
        let start = (note.start_time.max(0.0) * ticks_per_second).round() as u32;
        let end = ((note.end_time.max(0.0) * ticks_per_second).round() as u32).max(start + 1);

        events.push(AbsoluteEvent {
            tick: end,
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOff { key, vel },
            },
        });
        events.push(AbsoluteEvent {
            tick: start,
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn { key, vel },
            },
        });
    }

    events.sort_by_key(|e| {
        let on = matches!(
            e.kind,
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { .. },
                ..
            }
        );
        (e.tick, on)
    });

    let mut last = 0;
    events
        .into_iter()
        .map(|e| {
            let delta = e.tick - last;
            last = e.tick;
            TrackEvent {
                delta: delta.into(),
                kind: e.kind,
            }
        })
        .collect()
}

/// Encode notes as a single-track MIDI file at the given tempo.
pub fn midi_file_data(notes: &[Note], bpm: f32) -> Result<Vec<u8>> {
    if bpm <= 0.0 || !bpm.is_finite() {
        anyhow::bail!("Cannot write MIDI at {bpm} BPM");
    }

    let ticks_per_second = TICKS_PER_BEAT as f32 * bpm / 60.0;
    let micros_per_beat = (60_000_000.0 / bpm).round().min(0xFF_FFFF as f32) as u32;

    let mut track = Track::new();
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_beat))),
    });
    // 4/4: numerator 4, denominator 2^2, 24 clocks per click, 8 32nds per quarter
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
    });
    track.extend(note_events(notes, ticks_per_second));
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));
    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)
        .context("Failed to encode MIDI data")?;
    Ok(buffer)
}
