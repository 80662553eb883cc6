//! Model training
//!
//! Training loop, loss computation, and evaluation metrics.

pub mod evaluation;
pub mod metrics;
pub mod trainer;

pub use evaluation::{ClassificationReport, ConfusionMatrix};
pub use metrics::{Metrics, TrainingHistory};
pub use trainer::Trainer;
