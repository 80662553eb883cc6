//! Prediction pipeline
//!
//! Loads exported artifacts and runs quantized inference.

pub mod inference;

pub use inference::{format_prediction, Predictor};
