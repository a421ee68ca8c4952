use thiserror::Error;

/// Precondition violations caught at the segmentation boundary.
///
/// Everything else in the engine degrades gracefully (short runs are dropped,
/// unvoiced frames end notes); these are the inputs it refuses to guess about.
#[derive(Debug, Error, PartialEq)]
pub enum SegmentError {
    #[error("frame {index}: time {time} is not a finite number")]
    NonFiniteTime { index: usize, time: f32 },

    #[error("frame {index}: pitch {pitch} is not a finite number")]
    NonFinitePitch { index: usize, pitch: f32 },

    #[error("frame {index}: time {time} does not increase past the previous frame ({previous})")]
    NonMonotonicTime {
        index: usize,
        previous: f32,
        time: f32,
    },

    #[error("loudness series has {loudness} values but the pitch track has {frames} frames")]
    LoudnessLengthMismatch { frames: usize, loudness: usize },
}
