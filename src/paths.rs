use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Directory layout for notescribe.
///
///   Config:  $XDG_CONFIG_HOME/notescribe  (~/.config/notescribe)
///   Data:    $XDG_DATA_HOME/notescribe    (~/.local/share/notescribe)
///
/// The `dirs` crate handles platform detection; the resolved bases are
/// cached so lookup happens once.

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notescribe")
    })
}

pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notescribe")
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where transcriptions go when neither the CLI nor the config names a directory.
pub fn default_output_dir() -> PathBuf {
    data_dir().join("transcriptions")
}

/// Pick the output directory: CLI flag first, then config, then the default.
pub fn resolve_output_dir(cli: Option<&Path>, configured: &str) -> PathBuf {
    match cli {
        Some(dir) => dir.to_path_buf(),
        None if !configured.is_empty() => PathBuf::from(configured),
        None => default_output_dir(),
    }
}

/// `<dir>/<name>.<extension>`
pub fn output_file(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{name}.{extension}"))
}
