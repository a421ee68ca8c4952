mod analysis;
mod audio;
mod cli;
mod config;
mod dsp;
mod paths;
mod render;
mod transcription;
mod util;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use console::style;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Transcribe {
            input,
            name,
            output_dir,
            tempo,
            formats,
            min_note_ms,
            raw,
        } => {
            let config = config::load_config()?;
            let opts = analysis::analyzer::TranscribeOptions {
                input,
                name,
                output_dir,
                tempo,
                formats,
                min_note_ms,
                raw,
            };
            analysis::analyzer::run_transcribe(&opts, &config)?;
            Ok(())
        }

        Command::Track { input, raw } => {
            let config = config::load_config()?;
            analysis::analyzer::run_track(&input, raw, &config)
        }

        Command::Quantize { seconds, tempo } => analysis::analyzer::run_quantize(seconds, tempo),

        Command::Paths => {
            let config_file = paths::config_file();
            let exists = if config_file.exists() {
                style("(found)").green()
            } else {
                style("(not found, using defaults)").yellow()
            };
            println!("Config: {} {exists}", config_file.display());
            println!("Output: {}", paths::default_output_dir().display());
            Ok(())
        }
    }
}

/// `warn` by default, `-v` for info, `-vv` for debug. `RUST_LOG` wins.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
