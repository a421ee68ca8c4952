pub mod preprocess;
pub mod wav;
