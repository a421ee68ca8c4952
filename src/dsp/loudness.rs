/// Level (dB re full scale) that maps to loudness 0.0.
const FLOOR_DB: f32 = -60.0;

/// RMS of a sample buffer (linear, not dB).
pub fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Map an RMS level to [0, 1]: -60 dB and below → 0, 0 dB → 1, linear in dB.
pub fn rms_to_loudness(rms: f32) -> f32 {
    if rms <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * rms.log10();
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0)
}

/// One loudness value per pitch frame.
///
/// Each frame's window is centred on its timestamp and spans `window`
/// samples, the same positions the pitch tracker looked at. Windows running
/// past either end of the audio are truncated.
pub fn frame_loudness(
    samples: &[f32],
    sample_rate: u32,
    frame_times: &[f32],
    window: usize,
) -> Vec<f32> {
    let sr = sample_rate as f32;
    frame_times
        .iter()
        .map(|&t| {
            let center = (t * sr).round() as usize;
            let start = center.saturating_sub(window / 2).min(samples.len());
            let end = (center + window - window / 2).min(samples.len());
            rms_to_loudness(frame_rms(&samples[start..end]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_is_one() {
        assert!((rms_to_loudness(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn minus_thirty_db_is_half() {
        // 10^(-30/20) ≈ 0.0316
        assert!((rms_to_loudness(0.031_622_8) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn silence_is_zero() {
        assert_eq!(rms_to_loudness(0.0), 0.0);
        assert_eq!(rms_to_loudness(1e-6), 0.0);
    }

    #[test]
    fn rms_of_constant() {
        assert!((frame_rms(&[0.5; 10]) - 0.5).abs() < 1e-6);
        assert_eq!(frame_rms(&[]), 0.0);
    }

    #[test]
    fn loudness_aligns_with_frames() {
        // First half loud, second half silent
        let mut samples = vec![1.0; 1000];
        samples.extend(vec![0.0; 1000]);
        let loud = frame_loudness(&samples, 1000, &[0.0, 1.5], 100);
        assert_eq!(loud.len(), 2);
        assert!((loud[0] - 1.0).abs() < 1e-6);
        assert_eq!(loud[1], 0.0);
    }

    #[test]
    fn window_is_centred_on_frame_time() {
        // Loud only in 0.4..0.6 s; a 0.2 s window centred at 0.5 s sees all
        // of it, one starting at 0.5 s would see half silence.
        let mut samples = vec![0.0; 400];
        samples.extend(vec![1.0; 200]);
        samples.extend(vec![0.0; 400]);
        let loud = frame_loudness(&samples, 1000, &[0.5], 200);
        assert!((loud[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn window_past_end_is_truncated() {
        let loud = frame_loudness(&[0.5; 10], 10, &[0.5, 20.0], 100);
        assert_eq!(loud.len(), 2);
        assert!(loud[0] > 0.0);
        assert_eq!(loud[1], 0.0);
    }
}
