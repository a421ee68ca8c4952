pub mod chart;
pub mod json;
pub mod markdown;
pub mod midi;
pub mod musicxml;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use serde::{Deserialize, Serialize};

use crate::analysis::transcriber::Transcription;
use crate::config::OutputConfig;
use crate::paths;

/// Output file formats a transcription can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[value(name = "musicxml")]
    MusicXml,
    Midi,
    Markdown,
    Json,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::MusicXml => "musicxml",
            OutputFormat::Midi => "mid",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Png => "png",
        }
    }
}

/// Writes a transcription to a file in one format.
pub trait ScoreRenderer {
    fn format(&self) -> OutputFormat;

    fn render(&self, transcription: &Transcription, path: &Path) -> Result<()>;
}

/// The renderer for `format`, set up from the output section of the config.
pub fn renderer_for(format: OutputFormat, output: &OutputConfig) -> Box<dyn ScoreRenderer> {
    match format {
        OutputFormat::MusicXml => Box::new(musicxml::MusicXmlRenderer::new(
            &output.title,
            &output.composer,
        )),
        OutputFormat::Midi => Box::new(midi::MidiRenderer),
        OutputFormat::Markdown => Box::new(markdown::MarkdownRenderer::new(&output.title)),
        OutputFormat::Json => Box::new(json::JsonRenderer),
        OutputFormat::Png => Box::new(chart::PianoRollRenderer::new(&output.title)),
    }
}

/// Write every requested format to `<dir>/<name>.<ext>`.
///
/// A failing renderer is reported and skipped; the call only fails when
/// nothing at all could be written. Returns the files that were written.
pub fn render_all(
    transcription: &Transcription,
    dir: &Path,
    name: &str,
    formats: &[OutputFormat],
    output: &OutputConfig,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut written = Vec::new();
    for &format in formats {
        let renderer = renderer_for(format, output);
        let path = paths::output_file(dir, name, format.extension());

        match renderer.render(transcription, &path) {
            Ok(()) => {
                log::info!("Wrote {:?} to {}", renderer.format(), path.display());
                written.push(path);
            }
            Err(e) => {
                log::warn!("{:?} output failed: {e:#}", renderer.format());
                println!(
                    "  {} {} ({e:#})",
                    style("FAIL").red(),
                    path.display()
                );
            }
        }
    }

    if written.is_empty() {
        anyhow::bail!("No output files were written");
    }
    Ok(written)
}
