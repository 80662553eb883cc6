//! Neural network architecture
//!
//! One dense classifier in two representations:
//! - RepNet: the Burn module trained here
//! - QuantizedRepNet: the reduced-precision export for on-device inference

pub mod classifier;
pub mod quantized;

pub use classifier::{RepNet, RepNetConfig};
pub use quantized::QuantizedRepNet;
