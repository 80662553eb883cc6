//! Burn Dataset implementation for rep metric data
//!
//! Samples hold the raw scalar plus the encoded class index; one-hot
//! expansion happens at batch time.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::features::LabelEncoder;
use crate::{RepRecord, Result};

/// A single training sample
#[derive(Debug, Clone)]
pub struct RepSample {
    pub value: f32,
    pub class_index: usize,
}

/// In-memory dataset of encoded samples
#[derive(Debug, Clone)]
pub struct RepDataset {
    samples: Vec<RepSample>,
    num_classes: usize,
}

impl RepDataset {
    /// Encode raw records against a fitted label encoder
    pub fn from_records(records: &[RepRecord], encoder: &LabelEncoder) -> Result<Self> {
        let mut samples = Vec::with_capacity(records.len());
        for record in records {
            samples.push(RepSample {
                value: record.value,
                class_index: encoder.transform(&record.label)?,
            });
        }

        Ok(RepDataset {
            samples,
            num_classes: encoder.num_classes(),
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn samples(&self) -> &[RepSample] {
        &self.samples
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Shuffle with a seeded RNG, then split off the trailing fraction as
    /// the test partition.
    pub fn split_train_test(mut self, test_split: f32, seed: u64) -> (Self, Self) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);

        let n_train = (self.samples.len() as f32 * (1.0 - test_split)) as usize;
        let test_samples = self.samples.split_off(n_train);

        (
            RepDataset {
                samples: self.samples,
                num_classes: self.num_classes,
            },
            RepDataset {
                samples: test_samples,
                num_classes: self.num_classes,
            },
        )
    }

    /// Hold out the trailing fraction for validation without reshuffling,
    /// so the holdout is stable for a given train partition.
    pub fn split_validation(mut self, validation_split: f32) -> (Self, Self) {
        let n_fit = (self.samples.len() as f32 * (1.0 - validation_split)) as usize;
        let val_samples = self.samples.split_off(n_fit);

        (
            RepDataset {
                samples: self.samples,
                num_classes: self.num_classes,
            },
            RepDataset {
                samples: val_samples,
                num_classes: self.num_classes,
            },
        )
    }
}

impl Dataset<RepSample> for RepDataset {
    fn get(&self, index: usize) -> Option<RepSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Batch of rep samples for training
#[derive(Debug, Clone)]
pub struct RepBatch<B: Backend> {
    /// Scalar features: [batch, 1]
    pub values: Tensor<B, 2>,
    /// One-hot targets: [batch, num_classes]
    pub targets: Tensor<B, 2>,
}

/// Batcher producing feature tensors and one-hot targets
#[derive(Clone)]
pub struct RepBatcher<B: Backend> {
    device: B::Device,
    num_classes: usize,
}

impl<B: Backend> RepBatcher<B> {
    pub fn new(device: B::Device, num_classes: usize) -> Self {
        RepBatcher {
            device,
            num_classes,
        }
    }
}

impl<B: Backend> Batcher<B, RepSample, RepBatch<B>> for RepBatcher<B> {
    fn batch(&self, items: Vec<RepSample>, _device: &B::Device) -> RepBatch<B> {
        let batch_size = items.len();

        let mut value_data = Vec::with_capacity(batch_size);
        let mut target_data = vec![0.0f32; batch_size * self.num_classes];

        for (i, sample) in items.iter().enumerate() {
            value_data.push(sample.value);
            target_data[i * self.num_classes + sample.class_index] = 1.0;
        }

        let values = Tensor::<B, 1>::from_floats(value_data.as_slice(), &self.device)
            .reshape([batch_size, 1]);
        let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), &self.device)
            .reshape([batch_size, self.num_classes]);

        RepBatch { values, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample_dataset(n: usize) -> RepDataset {
        let records: Vec<RepRecord> = (0..n)
            .map(|i| RepRecord {
                value: i as f32,
                label: if i % 2 == 0 { "even" } else { "odd" }.to_string(),
            })
            .collect();
        let encoder = LabelEncoder::fit(records.iter().map(|r| r.label.as_str()));
        RepDataset::from_records(&records, &encoder).unwrap()
    }

    #[test]
    fn test_from_records_encodes_classes() {
        let dataset = sample_dataset(4);
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.num_classes(), 2);

        // "even" sorts before "odd"
        assert_eq!(dataset.samples()[0].class_index, 0);
        assert_eq!(dataset.samples()[1].class_index, 1);
    }

    #[test]
    fn test_split_train_test_sizes() {
        let (train, test) = sample_dataset(10).split_train_test(0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert_eq!(train.num_classes(), 2);
        assert_eq!(test.num_classes(), 2);
    }

    #[test]
    fn test_split_train_test_deterministic() {
        let values = |d: &RepDataset| -> Vec<f32> { d.samples().iter().map(|s| s.value).collect() };

        let (train_a, test_a) = sample_dataset(20).split_train_test(0.2, 42);
        let (train_b, test_b) = sample_dataset(20).split_train_test(0.2, 42);

        assert_eq!(values(&train_a), values(&train_b));
        assert_eq!(values(&test_a), values(&test_b));

        // The split partitions the data: nothing lost, nothing duplicated
        let mut all: Vec<f32> = values(&train_a).into_iter().chain(values(&test_a)).collect();
        all.sort_by(f32::total_cmp);
        let expected: Vec<f32> = (0..20).map(|i| i as f32).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_split_validation_takes_tail() {
        let (fit, val) = sample_dataset(10).split_validation(0.2);
        assert_eq!(fit.len(), 8);
        assert_eq!(val.len(), 2);

        // No reshuffle: the holdout is exactly the trailing samples
        assert_eq!(val.samples()[0].value, 8.0);
        assert_eq!(val.samples()[1].value, 9.0);
    }

    #[test]
    fn test_split_validation_rounds_holdout_up() {
        // 15 * 0.9 floors to 13 fit samples, so the holdout keeps 2
        let (fit, val) = sample_dataset(15).split_validation(0.1);
        assert_eq!(fit.len(), 13);
        assert_eq!(val.len(), 2);
        assert_eq!(val.samples()[0].value, 13.0);
        assert_eq!(val.samples()[1].value, 14.0);
    }

    #[test]
    fn test_batcher_shapes_and_one_hot() {
        let device = Default::default();
        let batcher = RepBatcher::<TestBackend>::new(device, 3);

        let items = vec![
            RepSample {
                value: 1.0,
                class_index: 2,
            },
            RepSample {
                value: -4.5,
                class_index: 0,
            },
        ];

        let batch = batcher.batch(items, &Default::default());
        assert_eq!(batch.values.dims(), [2, 1]);
        assert_eq!(batch.targets.dims(), [2, 3]);

        let target_data = batch.targets.into_data();
        let targets: &[f32] = target_data.as_slice().unwrap();
        assert_eq!(targets, &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);

        let value_data = batch.values.into_data();
        let values: &[f32] = value_data.as_slice().unwrap();
        assert_eq!(values, &[1.0, -4.5]);
    }
}
