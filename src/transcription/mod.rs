//! Note segmentation core: pitch track in, quantized notes out.
//!
//! Everything here is synchronous and pure. Audio decoding, pitch tracking,
//! tempo detection and rendering live behind the traits in `track` and
//! `crate::render`.

pub mod error;
pub mod note;
pub mod pitch;
pub mod quantize;
pub mod score;
pub mod segment;
pub mod stats;
pub mod track;
