//! Inference over exported artifacts

use crate::features::LabelEncoder;
use crate::model::QuantizedRepNet;
use crate::tasks::TaskSpec;
use crate::{DataConfig, Prediction, RepError, Result};

/// Predictor backed by a quantized model and its label encoder
pub struct Predictor {
    model: QuantizedRepNet,
    encoder: LabelEncoder,
}

impl Predictor {
    /// Create a predictor, rejecting artifacts whose shapes disagree
    pub fn new(model: QuantizedRepNet, encoder: LabelEncoder) -> Result<Self> {
        if model.input_dim() != 1 {
            return Err(RepError::Format(format!(
                "model takes {} input features, expected 1",
                model.input_dim()
            )));
        }
        if model.num_classes() != encoder.num_classes() {
            return Err(RepError::Format(format!(
                "model predicts {} classes but encoder has {}",
                model.num_classes(),
                encoder.num_classes()
            )));
        }
        Ok(Predictor { model, encoder })
    }

    /// Load the exported artifacts for a task
    pub fn load(task: &TaskSpec, data: &DataConfig) -> Result<Self> {
        let model_path = task.quantized_path(data);
        let encoder_path = task.encoder_path(data);

        if !model_path.is_file() || !encoder_path.is_file() {
            return Err(RepError::NoModel);
        }

        let model = QuantizedRepNet::load(&model_path)?;
        let encoder = LabelEncoder::load(&encoder_path)?;
        Self::new(model, encoder)
    }

    /// Classify a single rep metric value
    pub fn predict(&self, value: f32) -> Result<Prediction> {
        let probabilities = self.model.forward(value);

        let (class_index, confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, p)| (i, *p))
            .unwrap_or((0, 0.0));

        let label = self
            .encoder
            .inverse(class_index)
            .ok_or_else(|| RepError::Format(format!("class index {} out of range", class_index)))?
            .to_string();

        Ok(Prediction {
            label,
            class_index,
            confidence,
            probabilities,
        })
    }

    pub fn model(&self) -> &QuantizedRepNet {
        &self.model
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction, value: f32, classes: &[String]) -> String {
    let mut out = String::new();
    out.push_str("\n┌─────────────────────────────────────────────────┐\n");
    out.push_str(&format!("│  Rep value: {:.3}\n", value));
    out.push_str("├─────────────────────────────────────────────────┤\n");
    out.push_str(&format!("│  Predicted motion: {}\n", pred.label));
    out.push_str(&format!(
        "│  Confidence:       {:.1}% ({})\n",
        pred.confidence * 100.0,
        pred.confidence_level()
    ));
    out.push_str("│  Probabilities:\n");

    let width = classes.iter().map(|c| c.len()).max().unwrap_or(0);
    for (class, prob) in classes.iter().zip(pred.probabilities.iter()) {
        out.push_str(&format!(
            "│    {:<width$}  {:>5.1}%\n",
            class,
            prob * 100.0
        ));
    }

    out.push_str("└─────────────────────────────────────────────────┘\n");
    out
}
