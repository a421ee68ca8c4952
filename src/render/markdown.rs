use std::path::Path;

use anyhow::{Context, Result};

use super::{OutputFormat, ScoreRenderer};
use crate::analysis::transcriber::Transcription;
use crate::transcription::pitch::{midi_to_hz, midi_to_note_name};
use crate::transcription::score::ScoreEvent;
use crate::util;

/// Human-readable transcription report.
pub struct MarkdownRenderer {
    title: String,
}

impl MarkdownRenderer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

impl ScoreRenderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, transcription: &Transcription, path: &Path) -> Result<()> {
        let md = generate_report(transcription, &self.title);
        std::fs::write(path, md).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Build the markdown report. The caller decides where to save it.
pub fn generate_report(transcription: &Transcription, title: &str) -> String {
    let mut md = String::new();
    let stats = &transcription.stats;

    md.push_str(&format!("# {title}\n\n"));
    md.push_str(&format!(
        "Generated: {}  \n",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    ));
    md.push_str(&format!("Tempo: {:.1} BPM\n\n", transcription.tempo_bpm));

    md.push_str("## Statistics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Notes | {} |\n", stats.total_notes));
    md.push_str(&format!("| Duration | {:.2} s |\n", stats.duration));
    if stats.total_notes > 0 {
        let (low, high) = stats.pitch_range;
        md.push_str(&format!(
            "| Pitch range | {} – {} ({:.1} – {:.1} Hz) |\n",
            midi_to_note_name(low),
            midi_to_note_name(high),
            midi_to_hz(low),
            midi_to_hz(high),
        ));
    } else {
        md.push_str("| Pitch range | — |\n");
    }
    md.push_str(&format!(
        "| Mean note length | {:.3} s |\n",
        stats.average_note_duration
    ));
    md.push_str(&format!("| Distinct pitches | {} |\n", stats.unique_pitches));
    if transcription.frame_count > 0 {
        md.push_str(&format!(
            "| Voiced frames | {} / {} ({:.0}%) |\n",
            transcription.voiced_frames,
            transcription.frame_count,
            transcription.voiced_frames as f32 / transcription.frame_count as f32 * 100.0,
        ));
    }
    md.push_str(&format!("| Onsets | {} |\n", transcription.onset_count));
    md.push('\n');

    md.push_str("## Events\n\n");
    if transcription.notes.is_empty() {
        md.push_str("No notes detected.\n");
        return md;
    }

    let events = transcription.events();
    let rests = events.iter().filter(|e| e.is_rest()).count();
    md.push_str(&format!("{} notes, {} rests\n\n", events.len() - rests, rests));

    md.push_str("| # | Kind | Note | Start | End | Duration |\n");
    md.push_str("|---|------|------|-------|-----|----------|\n");
    for (i, event) in events.iter().enumerate() {
        let (kind, name) = match event {
            ScoreEvent::Note { note, .. } => ("note", note.name()),
            ScoreEvent::Rest { .. } => ("rest", "—".to_string()),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            kind,
            name,
            util::format_timestamp(event.start_time()),
            util::format_timestamp(event.end_time()),
            event.duration(),
        ));
    }
    md.push('\n');

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::note::Note;

    fn note(pitch: f32, start: f32, end: f32) -> Note {
        Note {
            pitch,
            start_time: start,
            end_time: end,
            velocity: 80,
        }
    }

    #[test]
    fn report_lists_notes_and_rests() {
        let transcription =
            Transcription::from_notes(vec![note(60.0, 0.0, 0.5), note(67.0, 1.0, 1.5)], 120.0);
        let md = generate_report(&transcription, "Test Song");

        assert!(md.starts_with("# Test Song"));
        assert!(md.contains("Tempo: 120.0 BPM"));
        assert!(md.contains("| Pitch range | C4 – G4 (261.6 – 392.0 Hz) |"));
        assert!(md.contains("2 notes, 1 rests"));
        assert!(md.contains("| 1 | note | C4 | 0:00.000 | 0:00.500 | quarter |"));
        assert!(md.contains("| 2 | rest | — | 0:00.500 | 0:01.000 | quarter |"));
        assert!(md.contains("| 3 | note | G4 |"));
    }

    #[test]
    fn empty_transcription() {
        let md = generate_report(&Transcription::from_notes(Vec::new(), 120.0), "Nothing");
        assert!(md.contains("No notes detected."));
        assert!(md.contains("| Pitch range | — |"));
    }
}
