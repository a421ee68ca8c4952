use std::f32::consts::PI;

/// Hann window coefficients of length `n`.
///
/// w(i) = 0.5 * (1 - cos(2π * i / (n - 1)))
///
/// Zero at both edges, one at the center. Tapering each frame this way
/// keeps a frame boundary that cuts a cycle in half from smearing energy
/// across the spectrum.
pub fn hann(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 2.0 * PI / (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (scale * i as f32).cos()))
        .collect()
}

/// Apply a Hann window to a slice of samples, returning a new Vec.
pub fn hanning(samples: &[f32]) -> Vec<f32> {
    if samples.len() <= 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .zip(hann(samples.len()))
        .map(|(&s, w)| s * w)
        .collect()
}

/// Number of full frames of `frame_size` that fit when stepping by `hop`.
pub fn frame_count(len: usize, frame_size: usize, hop: usize) -> usize {
    if frame_size == 0 || hop == 0 || len < frame_size {
        return 0;
    }
    (len - frame_size) / hop + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_zero_center_is_one() {
        let w = hann(101);
        assert!(w[0].abs() < 1e-6);
        assert!(w[100].abs() < 1e-6);
        assert!((w[50] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn window_is_symmetric() {
        let w = hann(64);
        for i in 0..32 {
            assert!((w[i] - w[63 - i]).abs() < 1e-6, "Asymmetry at index {i}");
        }
    }

    #[test]
    fn hanning_scales_samples() {
        let windowed = hanning(&[2.0; 101]);
        assert!((windowed[50] - 2.0).abs() < 1e-5);
        assert!(windowed[0].abs() < 1e-6);
    }

    #[test]
    fn degenerate_lengths() {
        assert!(hann(0).is_empty());
        assert_eq!(hann(1), vec![1.0]);
        assert_eq!(hanning(&[0.5]), vec![0.5]);
        assert!(hanning(&[]).is_empty());
    }

    #[test]
    fn frame_count_math() {
        assert_eq!(frame_count(2048, 2048, 512), 1);
        assert_eq!(frame_count(4096, 2048, 512), 5);
        assert_eq!(frame_count(100, 2048, 512), 0);
        assert_eq!(frame_count(4096, 0, 512), 0);
    }
}
