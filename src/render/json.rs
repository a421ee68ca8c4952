use std::path::Path;

use anyhow::{Context, Result};

use super::{OutputFormat, ScoreRenderer};
use crate::analysis::transcriber::Transcription;

/// Pretty-printed JSON dump of the whole transcription.
pub struct JsonRenderer;

impl ScoreRenderer for JsonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, transcription: &Transcription, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(transcription)
            .context("Failed to serialize transcription")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
