//! Dynamic-range quantized export format
//!
//! Weights are stored as per-tensor symmetric i8 with one f32 scale per
//! layer; biases stay f32. Inference dequantizes on the fly and runs in
//! plain f32 arithmetic, so the artifact needs no tensor backend.
//!
//! Container layout (.qrn, little-endian):
//!   magic "QRN1" | u32 header length | JSON header | per-layer payloads
//! where each payload is: f32 scale | i8 weights (in·out) | f32 bias (out).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use burn::nn::Linear;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::{RepError, Result};

const MAGIC: &[u8; 4] = b"QRN1";

/// One dense layer with quantized weights
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedLinear {
    pub in_features: usize,
    pub out_features: usize,
    /// Dequantization scale: weight ≈ quantized · scale
    pub scale: f32,
    /// Row-major [in_features, out_features]
    pub weights: Vec<i8>,
    pub bias: Vec<f32>,
}

impl QuantizedLinear {
    /// Quantize raw weights with a symmetric per-tensor scale
    pub fn quantize(
        weights: &[f32],
        bias: &[f32],
        in_features: usize,
        out_features: usize,
    ) -> Self {
        let max_abs = weights.iter().fold(0.0f32, |acc, w| acc.max(w.abs()));
        // All-zero weights quantize to zeros with a unit scale
        let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };

        let quantized = weights
            .iter()
            .map(|w| (w / scale).round().clamp(-127.0, 127.0) as i8)
            .collect();

        QuantizedLinear {
            in_features,
            out_features,
            scale,
            weights: quantized,
            bias: bias.to_vec(),
        }
    }

    /// Extract and quantize a Burn linear layer
    pub fn from_linear<B: Backend>(linear: &Linear<B>) -> Self {
        let weight = linear.weight.val();
        let [in_features, out_features] = weight.dims();

        let weight_data = weight.into_data();
        let weights: &[f32] = weight_data.as_slice().unwrap();

        let bias = match &linear.bias {
            Some(b) => b.val().into_data().as_slice::<f32>().unwrap().to_vec(),
            None => vec![0.0; out_features],
        };

        Self::quantize(weights, &bias, in_features, out_features)
    }

    /// Dequantized forward: y = x · W + b
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.in_features);

        let mut output = self.bias.clone();
        for (i, &x) in input.iter().enumerate() {
            let row = &self.weights[i * self.out_features..(i + 1) * self.out_features];
            for (o, &q) in row.iter().enumerate() {
                output[o] += x * (q as f32 * self.scale);
            }
        }
        output
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QrnHeader {
    input_dim: usize,
    num_classes: usize,
    layers: Vec<LayerDims>,
    trained_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayerDims {
    in_features: usize,
    out_features: usize,
}

/// Quantized network ready for on-device inference
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedRepNet {
    layers: Vec<QuantizedLinear>,
    trained_at: String,
}

impl QuantizedRepNet {
    pub fn new(layers: Vec<QuantizedLinear>) -> Self {
        QuantizedRepNet {
            layers,
            trained_at: chrono::Local::now().to_rfc3339(),
        }
    }

    pub fn layers(&self) -> &[QuantizedLinear] {
        &self.layers
    }

    pub fn trained_at(&self) -> &str {
        &self.trained_at
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.in_features).unwrap_or(0)
    }

    pub fn num_classes(&self) -> usize {
        self.layers.last().map(|l| l.out_features).unwrap_or(0)
    }

    /// Forward pass over a single scalar, returning softmax probabilities
    pub fn forward(&self, value: f32) -> Vec<f32> {
        let mut x = vec![value];
        let last = self.layers.len().saturating_sub(1);

        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x);
            // ReLU between hidden layers, softmax on the output
            if i < last {
                for v in &mut x {
                    *v = v.max(0.0);
                }
            }
        }

        softmax(&x)
    }

    /// Most probable class and its probability
    pub fn predict(&self, value: f32) -> (usize, f32) {
        let probs = self.forward(value);
        let index = argmax(&probs);
        let prob = probs[index];
        (index, prob)
    }

    /// Write the container to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let header = QrnHeader {
            input_dim: self.input_dim(),
            num_classes: self.num_classes(),
            layers: self
                .layers
                .iter()
                .map(|l| LayerDims {
                    in_features: l.in_features,
                    out_features: l.out_features,
                })
                .collect(),
            trained_at: self.trained_at.clone(),
        };
        let header_bytes = serde_json::to_vec(&header)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
        writer.write_all(&header_bytes)?;

        for layer in &self.layers {
            writer.write_all(&layer.scale.to_le_bytes())?;
            let raw: Vec<u8> = layer.weights.iter().map(|q| *q as u8).collect();
            writer.write_all(&raw)?;
            for b in &layer.bias {
                writer.write_all(&b.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Read a container written by [`QuantizedRepNet::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(RepError::Format(format!(
                "{} is not a quantized model file",
                path.display()
            )));
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;

        let mut header_bytes = vec![0u8; header_len];
        reader.read_exact(&mut header_bytes)?;
        let header: QrnHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| RepError::Format(format!("corrupt header: {}", e)))?;

        if header.layers.is_empty() {
            return Err(RepError::Format("header lists no layers".to_string()));
        }
        if header
            .layers
            .iter()
            .any(|l| l.in_features == 0 || l.out_features == 0)
        {
            return Err(RepError::Format("layer with a zero dimension".to_string()));
        }
        let first = &header.layers[0];
        let last = &header.layers[header.layers.len() - 1];
        if first.in_features != header.input_dim || last.out_features != header.num_classes {
            return Err(RepError::Format(
                "header dims do not match the layer dims".to_string(),
            ));
        }
        for pair in header.layers.windows(2) {
            if pair[0].out_features != pair[1].in_features {
                return Err(RepError::Format(
                    "layer dimensions do not chain".to_string(),
                ));
            }
        }

        let mut layers = Vec::with_capacity(header.layers.len());
        for dims in &header.layers {
            let mut scale_bytes = [0u8; 4];
            reader.read_exact(&mut scale_bytes)?;
            let scale = f32::from_le_bytes(scale_bytes);

            let mut raw = vec![0u8; dims.in_features * dims.out_features];
            reader.read_exact(&mut raw)?;
            let weights: Vec<i8> = raw.iter().map(|b| *b as i8).collect();

            let mut bias = Vec::with_capacity(dims.out_features);
            let mut bias_bytes = [0u8; 4];
            for _ in 0..dims.out_features {
                reader.read_exact(&mut bias_bytes)?;
                bias.push(f32::from_le_bytes(bias_bytes));
            }

            layers.push(QuantizedLinear {
                in_features: dims.in_features,
                out_features: dims.out_features,
                scale,
                weights,
                bias,
            });
        }

        Ok(QuantizedRepNet {
            layers,
            trained_at: header.trained_at,
        })
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RepNet, RepNetConfig};
    use burn::backend::NdArray;
    use burn::tensor::activation::softmax as burn_softmax;
    use burn::tensor::Tensor;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_quantize_bounds_error_by_half_scale() {
        let weights = [2.0f32, -4.0, 0.5, 1.25];
        let layer = QuantizedLinear::quantize(&weights, &[0.0, 0.0], 2, 2);

        assert_eq!(layer.scale, 4.0 / 127.0);
        for (w, q) in weights.iter().zip(layer.weights.iter()) {
            let dequantized = *q as f32 * layer.scale;
            assert!(
                (dequantized - w).abs() <= layer.scale / 2.0 + 1e-6,
                "weight {} dequantized to {}",
                w,
                dequantized
            );
        }
    }

    #[test]
    fn test_forward_with_unit_scale() {
        let layer = QuantizedLinear {
            in_features: 2,
            out_features: 2,
            scale: 1.0,
            weights: vec![1, 2, 3, 4],
            bias: vec![0.5, -0.5],
        };

        // y = x · W + b with W row-major [in, out]
        let output = layer.forward(&[1.0, 1.0]);
        assert_eq!(output, vec![1.0 + 3.0 + 0.5, 2.0 + 4.0 - 0.5]);
    }

    #[test]
    fn test_quantized_matches_float_model() {
        let device = Default::default();
        let config = RepNetConfig {
            input_dim: 1,
            hidden_dim: 16,
            num_classes: 3,
        };
        let model = RepNet::<TestBackend>::new(&device, config);
        let quantized = model.quantize();

        for value in [-2.0f32, 0.0, 1.5, 7.25] {
            let input = Tensor::<TestBackend, 1>::from_floats([value], &device).reshape([1, 1]);
            let float_probs = burn_softmax(model.forward(input), 1);
            let float_data = float_probs.into_data();
            let expected: &[f32] = float_data.as_slice().unwrap();

            let actual = quantized.forward(value);
            assert_eq!(actual.len(), 3);
            for (a, e) in actual.iter().zip(expected.iter()) {
                assert!(
                    (a - e).abs() < 0.05,
                    "value {}: quantized {} vs float {}",
                    value,
                    a,
                    e
                );
            }
        }
    }

    #[test]
    fn test_container_roundtrip() {
        let device = Default::default();
        let config = RepNetConfig {
            input_dim: 1,
            hidden_dim: 8,
            num_classes: 2,
        };
        let model = RepNet::<TestBackend>::new(&device, config);
        let quantized = model.quantize();

        let path = std::env::temp_dir().join("repnet_test_roundtrip.qrn");
        quantized.save(&path).unwrap();
        let loaded = QuantizedRepNet::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, quantized);
        assert_eq!(loaded.input_dim(), 1);
        assert_eq!(loaded.num_classes(), 2);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let path = std::env::temp_dir().join("repnet_test_badmagic.qrn");
        std::fs::write(&path, b"NOPE0000").unwrap();

        let err = QuantizedRepNet::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, RepError::Format(_)));
    }

    fn corrupt_header(input_dim: usize, num_classes: usize, layers: &[(usize, usize)]) -> String {
        let layers: Vec<_> = layers
            .iter()
            .map(|(i, o)| serde_json::json!({"in_features": i, "out_features": o}))
            .collect();
        serde_json::json!({
            "input_dim": input_dim,
            "num_classes": num_classes,
            "layers": layers,
            "trained_at": ""
        })
        .to_string()
    }

    fn write_container(name: &str, header: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_rejects_zero_dim_layer() {
        // A layer declaring no inputs would index past its weight vec
        let header = corrupt_header(1, 2, &[(0, 2)]);
        let path = write_container("repnet_test_zerodim.qrn", &header);

        let err = QuantizedRepNet::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, RepError::Format(_)));
    }

    #[test]
    fn test_rejects_empty_layer_list() {
        let header = corrupt_header(1, 2, &[]);
        let path = write_container("repnet_test_nolayers.qrn", &header);

        let err = QuantizedRepNet::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, RepError::Format(_)));
    }

    #[test]
    fn test_rejects_header_layer_mismatch() {
        let cases = [
            ("repnet_test_badinput.qrn", corrupt_header(1, 2, &[(2, 2)])),
            ("repnet_test_badoutput.qrn", corrupt_header(1, 2, &[(1, 3)])),
        ];
        for (name, header) in cases {
            let path = write_container(name, &header);
            let err = QuantizedRepNet::load(&path).unwrap_err();
            std::fs::remove_file(&path).ok();
            assert!(matches!(err, RepError::Format(_)), "header: {}", header);
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let config = RepNetConfig {
            input_dim: 1,
            hidden_dim: 16,
            num_classes: 5,
        };
        let quantized = RepNet::<TestBackend>::new(&device, config).quantize();

        let probs = quantized.forward(3.0);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        let (index, prob) = quantized.predict(3.0);
        assert!(index < 5);
        // The winning class carries at least the uniform share
        assert!(prob >= 0.2 - 1e-6);
    }
}
