/// Reference pitch: A4 = MIDI 69 = 440 Hz.
pub const A4_MIDI: f32 = 69.0;
pub const A4_HZ: f32 = 440.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a frequency in Hz to a continuous MIDI pitch number.
///
/// pitch = 69 + 12 * log2(f / 440)
///
/// Every octave doubles the frequency and spans 12 semitones, so the mapping
/// is logarithmic. The result is fractional: 445 Hz is about 69.2.
///
/// Returns 0.0 for anything that isn't a usable frequency (zero, negative,
/// NaN, infinite). Callers must read 0.0 as "unvoiced", not as MIDI note 0.
pub fn hz_to_midi(frequency_hz: f32) -> f32 {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return 0.0;
    }
    A4_MIDI + 12.0 * (frequency_hz / A4_HZ).log2()
}

/// Inverse of `hz_to_midi`: MIDI pitch number to frequency in Hz.
pub fn midi_to_hz(pitch: f32) -> f32 {
    A4_HZ * 2.0_f32.powf((pitch - A4_MIDI) / 12.0)
}

/// Scientific pitch name for a MIDI pitch, e.g. 60 → "C4", 61 → "C#4".
/// Fractional pitches are rounded to the nearest semitone first.
pub fn midi_to_note_name(pitch: f32) -> String {
    let midi = pitch.round() as i32;
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{name}{octave}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a440_is_69() {
        assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-5);
    }

    #[test]
    fn octave_is_twelve_semitones() {
        assert!((hz_to_midi(880.0) - 81.0).abs() < 1e-4);
        assert!((hz_to_midi(220.0) - 57.0).abs() < 1e-4);
    }

    #[test]
    fn middle_c() {
        // C4 ≈ 261.63 Hz
        assert!((hz_to_midi(261.63) - 60.0).abs() < 0.01);
    }

    #[test]
    fn fractional_pitch_is_kept() {
        let p = hz_to_midi(445.0);
        assert!(p > 69.1 && p < 69.3, "got {p}");
    }

    #[test]
    fn non_positive_frequency_is_unvoiced() {
        assert_eq!(hz_to_midi(0.0), 0.0);
        assert_eq!(hz_to_midi(-100.0), 0.0);
        assert_eq!(hz_to_midi(f32::NAN), 0.0);
        assert_eq!(hz_to_midi(f32::INFINITY), 0.0);
    }

    #[test]
    fn very_low_frequency_never_goes_negative_through_sentinel() {
        // 1 Hz maps to a negative pitch mathematically; the mapper still
        // returns the real value, the segmenter treats <= 0 as unvoiced.
        assert!(hz_to_midi(1.0) < 0.0);
        assert!(!hz_to_midi(1.0).is_nan());
    }

    #[test]
    fn midi_to_hz_inverts() {
        for midi in [21.0, 45.5, 60.0, 69.0, 108.0] {
            let back = hz_to_midi(midi_to_hz(midi));
            assert!((back - midi).abs() < 1e-3, "{midi} -> {back}");
        }
    }

    #[test]
    fn note_names() {
        assert_eq!(midi_to_note_name(60.0), "C4");
        assert_eq!(midi_to_note_name(61.0), "C#4");
        assert_eq!(midi_to_note_name(69.0), "A4");
        assert_eq!(midi_to_note_name(71.6), "C5");
        assert_eq!(midi_to_note_name(21.0), "A0");
        assert_eq!(midi_to_note_name(0.0), "C-1");
    }
}
