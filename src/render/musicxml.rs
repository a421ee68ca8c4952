use std::path::Path;

use anyhow::{Context, Result};

use super::{OutputFormat, ScoreRenderer};
use crate::analysis::transcriber::Transcription;
use crate::transcription::quantize::DurationClass;
use crate::transcription::score::ScoreEvent;

/// Divisions per quarter note. A 32nd is one division.
pub const DIVISIONS: u32 = 8;

/// One 4/4 measure in divisions.
pub const MEASURE_DIVISIONS: u32 = DIVISIONS * 4;

/// Note types from longest to shortest, for greedy decomposition.
const TYPES: [(u32, &str); 6] = [
    (32, "whole"),
    (16, "half"),
    (8, "quarter"),
    (4, "eighth"),
    (2, "16th"),
    (1, "32nd"),
];

const STEPS: [(&str, i8); 12] = [
    ("C", 0),
    ("C", 1),
    ("D", 0),
    ("D", 1),
    ("E", 0),
    ("F", 0),
    ("F", 1),
    ("G", 0),
    ("G", 1),
    ("A", 0),
    ("A", 1),
    ("B", 0),
];

/// MusicXML 3.1 partwise score: one part, 4/4, C major.
pub struct MusicXmlRenderer {
    title: String,
    composer: String,
}

impl MusicXmlRenderer {
    pub fn new(title: &str, composer: &str) -> Self {
        Self {
            title: title.to_string(),
            composer: composer.to_string(),
        }
    }

    pub fn to_xml(&self, transcription: &Transcription) -> String {
        let measures = measures(&transcription.events());
        let bpm = transcription.tempo_bpm.round().max(1.0) as u32;

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
        xml.push_str(
            "<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 3.1 Partwise//EN\" \
             \"http://www.musicxml.org/dtds/partwise.dtd\">\n",
        );
        xml.push_str("<score-partwise version=\"3.1\">\n");
        xml.push_str(&format!(
            "  <work>\n    <work-title>{}</work-title>\n  </work>\n",
            escape(&self.title)
        ));
        xml.push_str(&format!(
            "  <identification>\n    <creator type=\"composer\">{}</creator>\n  </identification>\n",
            escape(&self.composer)
        ));
        xml.push_str("  <part-list>\n");
        xml.push_str("    <score-part id=\"P1\">\n      <part-name>Melody</part-name>\n    </score-part>\n");
        xml.push_str("  </part-list>\n");
        xml.push_str("  <part id=\"P1\">\n");

        for (i, measure) in measures.iter().enumerate() {
            xml.push_str(&format!("    <measure number=\"{}\">\n", i + 1));
            if i == 0 {
                push_first_measure_header(&mut xml, bpm);
            }
            for piece in measure {
                push_piece(&mut xml, piece);
            }
            xml.push_str("    </measure>\n");
        }

        xml.push_str("  </part>\n");
        xml.push_str("</score-partwise>\n");
        xml
    }
}

impl ScoreRenderer for MusicXmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::MusicXml
    }

    fn render(&self, transcription: &Transcription, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml(transcription))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// One notated symbol inside a single measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// MIDI key, `None` for a rest.
    pub key: Option<u8>,
    pub divisions: u32,
    pub note_type: &'static str,
    pub tie_start: bool,
    pub tie_stop: bool,
}

/// Length of a duration class in divisions.
pub fn class_divisions(class: DurationClass) -> u32 {
    (class.beats() * DIVISIONS as f32).round() as u32
}

/// Split `divisions` into standard note types, longest first.
pub fn decompose(mut divisions: u32) -> Vec<(u32, &'static str)> {
    let mut parts = Vec::new();
    for &(size, name) in &TYPES {
        while divisions >= size {
            parts.push((size, name));
            divisions -= size;
        }
    }
    parts
}

/// Lay score events into 4/4 measures.
///
/// Events that cross a barline are split; the pieces of a note are tied
/// together. The last measure is filled up with rests.
pub fn measures(events: &[ScoreEvent]) -> Vec<Vec<Piece>> {
    let mut measures: Vec<Vec<Piece>> = vec![Vec::new()];
    let mut position = 0;

    for event in events {
        let key = match event {
            ScoreEvent::Note { note, .. } => Some(note.midi_key()),
            ScoreEvent::Rest { .. } => None,
        };
        let mut remaining = class_divisions(event.duration());
        let mut chunks = Vec::new();

        while remaining > 0 {
            if position == MEASURE_DIVISIONS {
                measures.push(Vec::new());
                position = 0;
            }
            let take = remaining.min(MEASURE_DIVISIONS - position);
            for (size, name) in decompose(take) {
                chunks.push((measures.len() - 1, size, name));
            }
            position += take;
            remaining -= take;
        }

        let last = chunks.len().saturating_sub(1);
        for (i, (measure, size, name)) in chunks.into_iter().enumerate() {
            let tied = key.is_some();
            measures[measure].push(Piece {
                key,
                divisions: size,
                note_type: name,
                tie_start: tied && i < last,
                tie_stop: tied && i > 0,
            });
        }
    }

    if position < MEASURE_DIVISIONS {
        let last = measures.len() - 1;
        for (size, name) in decompose(MEASURE_DIVISIONS - position) {
            measures[last].push(Piece {
                key: None,
                divisions: size,
                note_type: name,
                tie_start: false,
                tie_stop: false,
            });
        }
    }

    measures
}

fn push_first_measure_header(xml: &mut String, bpm: u32) {
    xml.push_str("      <attributes>\n");
    xml.push_str(&format!("        <divisions>{DIVISIONS}</divisions>\n"));
    xml.push_str("        <key>\n          <fifths>0</fifths>\n          <mode>major</mode>\n        </key>\n");
    xml.push_str("        <time>\n          <beats>4</beats>\n          <beat-type>4</beat-type>\n        </time>\n");
    xml.push_str("        <clef>\n          <sign>G</sign>\n          <line>2</line>\n        </clef>\n");
    xml.push_str("      </attributes>\n");
    xml.push_str("      <direction placement=\"above\">\n");
    xml.push_str("        <direction-type>\n          <metronome>\n");
    xml.push_str("            <beat-unit>quarter</beat-unit>\n");
    xml.push_str(&format!("            <per-minute>{bpm}</per-minute>\n"));
    xml.push_str("          </metronome>\n        </direction-type>\n");
    xml.push_str(&format!("        <sound tempo=\"{bpm}\"/>\n"));
    xml.push_str("      </direction>\n");
}

fn push_piece(xml: &mut String, piece: &Piece) {
    xml.push_str("      <note>\n");
    match piece.key {
        Some(key) => {
            let (step, alter) = STEPS[(key % 12) as usize];
            let octave = (key / 12) as i32 - 1;
            xml.push_str("        <pitch>\n");
            xml.push_str(&format!("          <step>{step}</step>\n"));
            if alter != 0 {
                xml.push_str(&format!("          <alter>{alter}</alter>\n"));
            }
            xml.push_str(&format!("          <octave>{octave}</octave>\n"));
            xml.push_str("        </pitch>\n");
        }
        None => xml.push_str("        <rest/>\n"),
    }
    xml.push_str(&format!("        <duration>{}</duration>\n", piece.divisions));
    if piece.tie_stop {
        xml.push_str("        <tie type=\"stop\"/>\n");
    }
    if piece.tie_start {
        xml.push_str("        <tie type=\"start\"/>\n");
    }
    xml.push_str(&format!("        <type>{}</type>\n", piece.note_type));
    if piece.key.is_some() && (piece.tie_start || piece.tie_stop) {
        xml.push_str("        <notations>\n");
        if piece.tie_stop {
            xml.push_str("          <tied type=\"stop\"/>\n");
        }
        if piece.tie_start {
            xml.push_str("          <tied type=\"start\"/>\n");
        }
        xml.push_str("        </notations>\n");
    }
    xml.push_str("      </note>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
