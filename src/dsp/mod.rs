pub mod loudness;
pub mod onset;
pub mod pitch;
pub mod tempo;
pub mod windowing;
