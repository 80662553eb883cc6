//! Label encoding
//!
//! Converts raw string labels into model-ready class indices.

pub mod labels;

pub use labels::LabelEncoder;
