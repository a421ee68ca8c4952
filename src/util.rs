use std::path::Path;

/// Longest output name we generate from a title or file stem.
const MAX_NAME_LEN: usize = 50;

/// Turn an arbitrary title into a safe file stem.
///
/// Keeps letters, digits, spaces, '-' and '_', turns spaces into '_',
/// and caps the length. Falls back to "transcription" if nothing survives.
pub fn sanitize_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let name: String = kept
        .trim()
        .replace(' ', "_")
        .chars()
        .take(MAX_NAME_LEN)
        .collect();

    if name.is_empty() {
        "transcription".into()
    } else {
        name
    }
}

/// Output name derived from the input file's stem.
pub fn name_from_input(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_name(&stem)
}

/// Linear amplitude to dB, -infinity for zero.
pub fn amplitude_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

/// Seconds as m:ss.mmm for tables.
pub fn format_timestamp(seconds: f32) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{minutes}:{secs:02}.{ms:03}")
}
