//! Dense classifier for scalar rep metrics
//!
//! Architecture: Input(1) → Hidden(16) → ReLU
//!                        → Hidden(16) → ReLU
//!                        → Output(num_classes) logits
//!
//! Softmax is applied by callers (loss and inference), not in forward.

use std::path::Path;

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::model::quantized::{QuantizedLinear, QuantizedRepNet};
use crate::ModelConfig;

/// Configuration for the classifier
#[derive(Debug, Clone)]
pub struct RepNetConfig {
    /// Input dimension (one scalar feature)
    pub input_dim: usize,
    /// Width of both hidden layers
    pub hidden_dim: usize,
    /// Number of output classes
    pub num_classes: usize,
}

impl RepNetConfig {
    pub fn from_model_config(model: &ModelConfig, num_classes: usize) -> Self {
        RepNetConfig {
            input_dim: 1,
            hidden_dim: model.hidden_dim,
            num_classes,
        }
    }
}

/// Two-hidden-layer dense classifier
#[derive(Module, Debug)]
pub struct RepNet<B: Backend> {
    hidden1: Linear<B>,
    hidden2: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> RepNet<B> {
    /// Create a new model with randomly initialized weights
    pub fn new(device: &B::Device, config: RepNetConfig) -> Self {
        RepNet {
            hidden1: LinearConfig::new(config.input_dim, config.hidden_dim).init(device),
            hidden2: LinearConfig::new(config.hidden_dim, config.hidden_dim).init(device),
            output: LinearConfig::new(config.hidden_dim, config.num_classes).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `values` - Scalar features [batch, 1]
    ///
    /// # Returns
    /// Class logits [batch, num_classes]
    pub fn forward(&self, values: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden1.forward(values));
        let x = relu(self.hidden2.forward(x));
        self.output.forward(x)
    }

    /// Quantize every layer for on-device export
    pub fn quantize(&self) -> QuantizedRepNet {
        QuantizedRepNet::new(vec![
            QuantizedLinear::from_linear(&self.hidden1),
            QuantizedLinear::from_linear(&self.hidden2),
            QuantizedLinear::from_linear(&self.output),
        ])
    }

    /// Save model weights; Burn appends the .mpk extension
    pub fn save(&self, path: &Path) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.to_path_buf())
            .map_err(|e| crate::RepError::Io(std::io::Error::other(e.to_string())))
    }

    /// Load model weights from a checkpoint
    pub fn load(device: &B::Device, path: &Path, config: RepNetConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| crate::RepError::Io(std::io::Error::other(e.to_string())))?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}
