use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::render::OutputFormat;

#[derive(Parser)]
#[command(name = "notescribe")]
#[command(about = "Transcribe single-voice recordings into sheet music")]
pub struct Cli {
    /// Log more (-v for progress, -vv for debug detail)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Transcribe a WAV file and write the score files
    Transcribe {
        /// Input WAV file
        input: PathBuf,

        /// Base name for output files (defaults to the input file name)
        #[arg(long)]
        name: Option<String>,

        /// Where to write output files (overrides the config)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Use this tempo instead of detecting one
        #[arg(long)]
        tempo: Option<f32>,

        /// Output format, repeatable (defaults to the config's list)
        #[arg(long = "format", value_enum)]
        formats: Vec<OutputFormat>,

        /// Shortest note to keep, in milliseconds
        #[arg(long)]
        min_note_ms: Option<f32>,

        /// Skip silence trimming, normalization and filtering
        #[arg(long)]
        raw: bool,
    },

    /// Print the pitch track of a WAV file as JSON
    Track {
        /// Input WAV file
        input: PathBuf,

        /// Skip silence trimming, normalization and filtering
        #[arg(long)]
        raw: bool,
    },

    /// Show which note value a duration becomes at a tempo
    Quantize {
        /// Duration in seconds
        seconds: f32,

        /// Tempo in BPM
        #[arg(long, default_value_t = 120.0)]
        tempo: f32,
    },

    /// Show where config and output files are stored
    Paths,
}
