use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::transcriber::{Transcriber, Transcription};
use crate::audio::preprocess::{self, AudioStats};
use crate::audio::wav;
use crate::config::AppConfig;
use crate::dsp::pitch::{McLeodTracker, PitchConfig};
use crate::dsp::tempo::AutocorrelationTempo;
use crate::paths;
use crate::render::{self, OutputFormat};
use crate::transcription::pitch::midi_to_note_name;
use crate::transcription::quantize::{quantize_duration, seconds_to_beats, DurationClass};
use crate::transcription::segment::SegmentationConfig;
use crate::transcription::track::{FixedTempo, TempoEstimator};
use crate::util;

/// Options for `notescribe transcribe` that override the config.
pub struct TranscribeOptions {
    pub input: PathBuf,
    pub name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub tempo: Option<f32>,
    pub formats: Vec<OutputFormat>,
    pub min_note_ms: Option<f32>,
    pub raw: bool,
}

/// Audio ready for analysis, after optional preprocessing.
struct PreparedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Full pipeline: load, clean up, transcribe, write every requested format.
pub fn run_transcribe(opts: &TranscribeOptions, config: &AppConfig) -> Result<Transcription> {
    println!(
        "Transcribing {}...",
        style(opts.input.display()).cyan()
    );
    println!();

    let audio = prepare_audio(&opts.input, opts.raw, config, &mut io::stdout())?;

    let mut segmentation = config.segmentation.clone();
    if let Some(ms) = opts.min_note_ms {
        if ms < 0.0 {
            anyhow::bail!("--min-note-ms must not be negative");
        }
        segmentation.min_note_duration = ms / 1000.0;
    }

    let spinner = spinner("Tracking pitch and tempo");
    let result = match opts.tempo {
        Some(bpm) => transcribe_with(FixedTempo(bpm), &audio, &segmentation, config),
        None => {
            let tempo = AutocorrelationTempo::new((&config.tempo).into(), (&config.tempo).into());
            transcribe_with(tempo, &audio, &segmentation, config)
        }
    };
    spinner.finish_and_clear();
    let transcription = result?;

    print_transcription(&transcription);

    let name = match &opts.name {
        Some(name) => util::sanitize_name(name),
        None => util::name_from_input(&opts.input),
    };
    let dir = paths::resolve_output_dir(opts.output_dir.as_deref(), &config.output.dir);
    let formats = if opts.formats.is_empty() {
        &config.output.formats
    } else {
        &opts.formats
    };

    println!();
    let written = render::render_all(&transcription, &dir, &name, formats, &config.output)?;
    for path in &written {
        println!("  {} {}", style("OK").green(), path.display());
    }
    println!();
    println!(
        "Output saved to {}",
        style(dir.display()).green()
    );

    Ok(transcription)
}

/// Print the masked pitch track as JSON on stdout. Everything else goes to
/// stderr so the output can be redirected to a file.
pub fn run_track(input: &Path, raw: bool, config: &AppConfig) -> Result<()> {
    write_track(input, raw, config, &mut io::stdout(), &mut io::stderr())
}

fn write_track(
    input: &Path,
    raw: bool,
    config: &AppConfig,
    out: &mut impl Write,
    status: &mut impl Write,
) -> Result<()> {
    let audio = prepare_audio(input, raw, config, status)?;
    let transcriber = Transcriber::new(
        McLeodTracker::new(PitchConfig::from(&config.analysis)),
        FixedTempo(config.tempo.fallback_bpm),
        &config.segmentation,
    );

    let spinner = spinner("Tracking pitch");
    let track = transcriber.masked_track(&audio.samples, audio.sample_rate);
    spinner.finish_and_clear();

    let json = serde_json::to_string_pretty(&track?).context("Failed to serialize pitch track")?;
    writeln!(out, "{json}")?;
    Ok(())
}

/// Print the duration class a length in seconds maps to.
pub fn run_quantize(seconds: f32, bpm: f32) -> Result<()> {
    if bpm <= 0.0 || !bpm.is_finite() {
        anyhow::bail!("Tempo must be a positive number of BPM, got {bpm}");
    }
    if seconds < 0.0 || !seconds.is_finite() {
        anyhow::bail!("Duration must be a non-negative number of seconds, got {seconds}");
    }

    let class = quantize_duration(seconds, bpm);
    println!(
        "{seconds:.3}s at {bpm:.1} BPM = {:.3} beats → {}",
        seconds_to_beats(seconds, bpm),
        style(class).cyan()
    );
    println!();

    let beat_secs = 60.0 / bpm;
    for candidate in DurationClass::ALL.iter().rev() {
        let line = format!(
            "  {:<8} {:>5.3} beats  {:>7.3}s",
            candidate.label(),
            candidate.beats(),
            candidate.beats() * beat_secs
        );
        if *candidate == class {
            println!("{}", style(line).green().bold());
        } else {
            println!("{}", style(line).dim());
        }
    }
    Ok(())
}

fn transcribe_with<T: TempoEstimator>(
    tempo: T,
    audio: &PreparedAudio,
    segmentation: &SegmentationConfig,
    config: &AppConfig,
) -> Result<Transcription> {
    let tracker = McLeodTracker::new(PitchConfig::from(&config.analysis));
    Transcriber::new(tracker, tempo, segmentation).transcribe(&audio.samples, audio.sample_rate)
}

/// Load a WAV file as mono and, unless `raw`, trim/normalize/filter it.
/// Audio stats are written to `status`.
fn prepare_audio(
    input: &Path,
    raw: bool,
    config: &AppConfig,
    status: &mut impl Write,
) -> Result<PreparedAudio> {
    let loaded =
        wav::load_mono(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let sample_rate = loaded.spec.sample_rate;
    log::info!(
        "Loaded {} ({:.2}s, {} Hz, {}-bit)",
        input.display(),
        loaded.duration_secs(),
        sample_rate,
        loaded.spec.bits_per_sample
    );

    if loaded.samples.is_empty() {
        anyhow::bail!("{} contains no audio samples", input.display());
    }

    let stats = preprocess::audio_stats(&loaded.samples, sample_rate, loaded.spec.channels);
    print_audio_stats(status, &stats)?;

    let samples = if raw {
        loaded.samples
    } else {
        let cleaned = preprocess::preprocess(&loaded.samples, sample_rate, &config.preprocess);
        if cleaned.trimmed_start_secs > 0.0 {
            writeln!(
                status,
                "     Trimmed:  {:.2}s of leading silence",
                cleaned.trimmed_start_secs
            )?;
        }
        cleaned.samples
    };

    Ok(PreparedAudio {
        samples,
        sample_rate,
    })
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg} {elapsed}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_audio_stats(out: &mut impl Write, s: &AudioStats) -> io::Result<()> {
    writeln!(
        out,
        "  {} {:.1}s, {} Hz, {} channel(s)",
        style(">>").cyan(),
        s.duration,
        s.sample_rate,
        s.channels
    )?;
    writeln!(
        out,
        "     Peak:     {:.1} dBFS {}",
        util::amplitude_db(s.max_amplitude),
        level_label(s.max_amplitude)
    )?;
    writeln!(out, "     RMS:      {:.1} dBFS", util::amplitude_db(s.rms_energy))?;
    writeln!(out, "     ZCR:      {:.3}", s.zero_crossing_rate)
}

fn print_transcription(t: &Transcription) {
    let s = &t.stats;
    println!("     Tempo:    {:.1} BPM ({} onsets)", t.tempo_bpm, t.onset_count);
    println!(
        "     Voiced:   {} of {} frames",
        t.voiced_frames, t.frame_count
    );
    println!("     Notes:    {}", s.total_notes);
    if s.total_notes > 0 {
        println!(
            "     Range:    {} - {}",
            midi_to_note_name(s.pitch_range.0),
            midi_to_note_name(s.pitch_range.1)
        );
        println!("     Mean len: {:.3}s", s.average_note_duration);
    } else {
        println!(
            "     {}",
            style("No notes detected; the score will be a single rest").yellow()
        );
    }
}

/// Label for the recording's peak level.
fn level_label(peak: f32) -> String {
    if peak >= 0.999 {
        format!("{}", style("(clipping)").red())
    } else if peak < 0.05 {
        format!("{}", style("(very quiet)").yellow())
    } else {
        format!("{}", style("(ok)").green())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::note::PitchPoint;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_tone(path: &Path, freqs: &[f32], secs_each: f32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &f in freqs {
            let n = (22050.0 * secs_each) as usize;
            for i in 0..n {
                let t = i as f32 / 22050.0;
                let s = 0.5 * (2.0 * std::f32::consts::PI * f * t).sin();
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn transcribes_two_tones_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("two tones.wav");
        // A4 then C5, 0.6 s each
        write_tone(&input, &[440.0, 523.25], 0.6);

        let opts = TranscribeOptions {
            input: input.clone(),
            name: None,
            output_dir: Some(dir.path().join("out")),
            tempo: Some(120.0),
            formats: vec![OutputFormat::Json, OutputFormat::Midi],
            min_note_ms: None,
            raw: true,
        };
        let transcription = run_transcribe(&opts, &AppConfig::default()).unwrap();

        let keys: Vec<u8> = transcription.notes.iter().map(|n| n.midi_key()).collect();
        assert_eq!(keys, vec![69, 72]);
        assert!(dir.path().join("out/two_tones.json").exists());
        assert!(dir.path().join("out/two_tones.mid").exists());
    }

    #[test]
    fn track_output_is_pure_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        // Leading silence so the trim message is written too
        write_tone(&input, &[0.0, 440.0], 0.5);

        let mut out = Vec::new();
        let mut status = Vec::new();
        write_track(&input, false, &AppConfig::default(), &mut out, &mut status).unwrap();

        let points: Vec<PitchPoint> = serde_json::from_slice(&out).unwrap();
        assert!(!points.is_empty());
        assert!(points.iter().any(|p| (p.pitch - 69.0).abs() < 0.5));

        let status = String::from_utf8(status).unwrap();
        assert!(status.contains("Peak:"));
        assert!(status.contains("Trimmed:"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let opts = TranscribeOptions {
            input: PathBuf::from("/tmp/notescribe-no-such-file.wav"),
            name: None,
            output_dir: None,
            tempo: Some(120.0),
            formats: Vec::new(),
            min_note_ms: None,
            raw: false,
        };
        assert!(run_transcribe(&opts, &AppConfig::default()).is_err());
    }

    #[test]
    fn quantize_validates_input() {
        assert!(run_quantize(0.5, 120.0).is_ok());
        assert!(run_quantize(0.5, 0.0).is_err());
        assert!(run_quantize(-1.0, 120.0).is_err());
    }
}
