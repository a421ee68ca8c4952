use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use super::{OutputFormat, ScoreRenderer};
use crate::analysis::transcriber::Transcription;
use crate::transcription::pitch::midi_to_note_name;

/// Chart dimensions
const WIDTH: u32 = 1400;
const HEIGHT: u32 = 600;

/// Colors for note bars
const COLOR_NOTE: RGBColor = RGBColor(41, 128, 185); // blue
const COLOR_EDGE: RGBColor = RGBColor(21, 67, 96); // dark blue
const COLOR_BEAT: RGBColor = RGBColor(220, 220, 220); // light gray

/// Piano-roll PNG: time on x, MIDI pitch on y, one bar per note.
pub struct PianoRollRenderer {
    title: String,
}

impl PianoRollRenderer {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

impl ScoreRenderer for PianoRollRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn render(&self, transcription: &Transcription, path: &Path) -> Result<()> {
        draw_piano_roll(transcription, &self.title, path)
    }
}

/// Axis ranges for the roll: `(seconds, pitch)`.
///
/// Pitch gets a semitone of room below the lowest bar and two above the
/// highest; an empty transcription shows an octave around middle C.
pub fn roll_bounds(transcription: &Transcription) -> (std::ops::Range<f32>, std::ops::Range<f32>) {
    let stats = &transcription.stats;
    let end = stats.duration.max(1.0);

    if stats.total_notes == 0 {
        return (0.0..end, 54.0..67.0);
    }
    let (low, high) = stats.pitch_range;
    (0.0..end, (low - 1.0)..(high + 2.0))
}

/// Beat positions in seconds up to `end`, for the vertical grid.
pub fn beat_times(bpm: f32, end: f32) -> Vec<f32> {
    if bpm <= 0.0 {
        return Vec::new();
    }
    let beat = 60.0 / bpm;
    (0..)
        .map(|i| i as f32 * beat)
        .take_while(|&t| t <= end)
        .collect()
}

fn draw_piano_roll(transcription: &Transcription, title: &str, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (x_range, y_range) = roll_bounds(transcription);
    let (y_min, y_max) = (y_range.start, y_range.end);

    let root = BitMapBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill background")?;

    let caption = format!("{title} — {:.0} BPM", transcription.tempo_bpm);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Time (s)")
        .y_labels(((y_max - y_min) as usize).min(24))
        .y_label_formatter(&|y| midi_to_note_name(*y))
        .draw()?;

    // Beat grid
    for t in beat_times(transcription.tempo_bpm, transcription.stats.duration) {
        chart.draw_series(LineSeries::new(
            vec![(t, y_min), (t, y_max)],
            &COLOR_BEAT,
        ))?;
    }

    // One bar per note, slightly thinner than a semitone row
    let bars: Vec<[(f32, f32); 2]> = transcription
        .notes
        .iter()
        .map(|n| [(n.start_time, n.pitch - 0.4), (n.end_time, n.pitch + 0.4)])
        .collect();
    chart.draw_series(bars.iter().map(|&b| Rectangle::new(b, COLOR_NOTE.filled())))?;
    chart.draw_series(bars.iter().map(|&b| Rectangle::new(b, COLOR_EDGE.stroke_width(1))))?;

    root.present().context("Failed to write piano roll PNG")?;

    Ok(())
}
