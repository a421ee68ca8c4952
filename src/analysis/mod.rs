pub mod analyzer;
pub mod transcriber;
