use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::preprocess::PreprocessConfig;
use crate::dsp::onset::OnsetConfig;
use crate::dsp::pitch::PitchConfig;
use crate::dsp::tempo::TempoConfig;
use crate::paths;
use crate::render::OutputFormat;
use crate::transcription::segment::SegmentationConfig;

/// Application configuration, loaded from config.toml.
///
/// Every section uses `#[serde(default)]`, so a missing file, a missing
/// section or a missing field all fall back to the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub segmentation: SegmentationConfig,
    pub tempo: TempoSettings,
    pub preprocess: PreprocessConfig,
    pub output: OutputConfig,
}

/// Pitch tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pitch_floor_hz: f32,
    pub pitch_ceiling_hz: f32,
    pub frame_size_ms: f32,
    pub hop_size_ms: f32,
    pub power_threshold: f64,
    pub clarity_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoSettings {
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Used when detection finds no clear beat.
    pub fallback_bpm: f32,
    pub onset_frame_size: usize,
    pub onset_hop_size: usize,
    pub onset_delta: f32,
    pub min_onset_gap_ms: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory. Empty means the platform default from `paths`.
    pub dir: String,
    pub formats: Vec<OutputFormat>,
    pub title: String,
    pub composer: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let pitch = PitchConfig::default();
        Self {
            pitch_floor_hz: pitch.pitch_floor_hz,
            pitch_ceiling_hz: pitch.pitch_ceiling_hz,
            frame_size_ms: pitch.frame_size_ms,
            hop_size_ms: pitch.hop_size_ms,
            power_threshold: pitch.power_threshold,
            clarity_threshold: pitch.clarity_threshold,
        }
    }
}

impl Default for TempoSettings {
    fn default() -> Self {
        let tempo = TempoConfig::default();
        let onsets = OnsetConfig::default();
        Self {
            min_bpm: tempo.min_bpm,
            max_bpm: tempo.max_bpm,
            fallback_bpm: tempo.fallback_bpm,
            onset_frame_size: onsets.frame_size,
            onset_hop_size: onsets.hop_size,
            onset_delta: onsets.delta,
            min_onset_gap_ms: onsets.min_gap_ms,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            formats: vec![OutputFormat::MusicXml, OutputFormat::Midi],
            title: "Audio Transcription".into(),
            composer: "Auto-transcribed".into(),
        }
    }
}

impl From<&AnalysisConfig> for PitchConfig {
    fn from(cfg: &AnalysisConfig) -> Self {
        PitchConfig {
            pitch_floor_hz: cfg.pitch_floor_hz,
            pitch_ceiling_hz: cfg.pitch_ceiling_hz,
            frame_size_ms: cfg.frame_size_ms,
            hop_size_ms: cfg.hop_size_ms,
            power_threshold: cfg.power_threshold,
            clarity_threshold: cfg.clarity_threshold,
        }
    }
}

impl From<&TempoSettings> for TempoConfig {
    fn from(cfg: &TempoSettings) -> Self {
        TempoConfig {
            min_bpm: cfg.min_bpm,
            max_bpm: cfg.max_bpm,
            fallback_bpm: cfg.fallback_bpm,
        }
    }
}

impl From<&TempoSettings> for OnsetConfig {
    fn from(cfg: &TempoSettings) -> Self {
        OnsetConfig {
            frame_size: cfg.onset_frame_size,
            hop_size: cfg.onset_hop_size,
            delta: cfg.onset_delta,
            min_gap_ms: cfg.min_onset_gap_ms,
        }
    }
}

/// Load the config from the platform config directory.
/// If the file doesn't exist, returns defaults.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&paths::config_file())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    validate(&config).with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

/// Reject values that would make the pipeline misbehave rather than fail.
pub fn validate(config: &AppConfig) -> Result<()> {
    let a = &config.analysis;
    if a.pitch_floor_hz <= 0.0 || a.pitch_ceiling_hz <= a.pitch_floor_hz {
        anyhow::bail!(
            "analysis: pitch range {}..{} Hz is empty",
            a.pitch_floor_hz,
            a.pitch_ceiling_hz
        );
    }
    if a.hop_size_ms <= 0.0 || a.frame_size_ms <= 0.0 {
        anyhow::bail!("analysis: frame and hop sizes must be positive");
    }

    let t = &config.tempo;
    if t.fallback_bpm <= 0.0 {
        anyhow::bail!("tempo: fallback_bpm must be positive");
    }
    if t.min_bpm <= 0.0 || t.max_bpm < t.min_bpm {
        anyhow::bail!("tempo: BPM range {}..{} is empty", t.min_bpm, t.max_bpm);
    }
    if t.onset_frame_size == 0 || t.onset_hop_size == 0 {
        anyhow::bail!("tempo: onset frame and hop sizes must be positive");
    }

    let s = &config.segmentation;
    if s.min_note_duration < 0.0 || s.semitone_threshold <= 0.0 {
        anyhow::bail!("segmentation: durations and thresholds must be positive");
    }
    if s.default_velocity > 127 {
        anyhow::bail!("segmentation: default_velocity must be at most 127");
    }

    Ok(())
}
