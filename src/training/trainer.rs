//! Training loop and loss computation

use burn::data::dataloader::DataLoaderBuilder;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::softmax;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};

use crate::data::dataset::{RepBatch, RepBatcher, RepDataset};
use crate::model::RepNet;
use crate::training::evaluation::argmax_classes;
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{Result, TrainingConfig};

/// Categorical cross-entropy over softmax probabilities
pub fn categorical_cross_entropy<B: Backend>(
    probs: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.neg() * probs_clamped.log();
    loss.sum_dim(1).mean()
}

/// Count predictions whose top class matches the one-hot target
pub fn count_correct(probs: &[f32], targets: &[f32], num_classes: usize) -> usize {
    let predicted = argmax_classes(probs, num_classes);
    let actual = argmax_classes(targets, num_classes);
    predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, t)| p == t)
        .count()
}

fn batch_correct<B: Backend>(
    probs: &Tensor<B, 2>,
    targets: &Tensor<B, 2>,
    num_classes: usize,
) -> usize {
    let probs_data = probs.clone().into_data();
    let targets_data = targets.clone().into_data();
    let probs_slice: &[f32] = probs_data.as_slice().unwrap();
    let targets_slice: &[f32] = targets_data.as_slice().unwrap();
    count_correct(probs_slice, targets_slice, num_classes)
}

/// Trainer for the RepNet classifier
pub struct Trainer<B: AutodiffBackend> {
    model: RepNet<B>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<burn::optim::Adam, RepNet<B>, B>,
    config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer
    pub fn new(model: RepNet<B>, config: TrainingConfig, device: B::Device) -> Self {
        let optimizer = AdamConfig::new().init();

        Trainer {
            model,
            optimizer,
            config,
            device,
        }
    }

    /// Train for the configured number of epochs and return the final model
    pub fn train(
        mut self,
        train_dataset: RepDataset,
        val_dataset: RepDataset,
    ) -> Result<(RepNet<B>, TrainingHistory)> {
        let num_classes = train_dataset.num_classes();

        let batcher_train = RepBatcher::<B>::new(self.device.clone(), num_classes);
        let batcher_val = RepBatcher::<B>::new(self.device.clone(), num_classes);

        let train_loader = DataLoaderBuilder::new(batcher_train)
            .batch_size(self.config.batch_size)
            .shuffle(self.config.seed)
            .build(train_dataset);

        let val_loader = DataLoaderBuilder::new(batcher_val)
            .batch_size(self.config.batch_size)
            .build(val_dataset);

        let mut history = TrainingHistory::new();

        log::info!("Starting training for {} epochs", self.config.epochs);

        for epoch in 0..self.config.epochs {
            let train_metrics = self.train_epoch(train_loader.iter(), num_classes);
            let val_metrics = self.validate_epoch(val_loader.iter(), num_classes);

            history.record_epoch(epoch, &train_metrics, &val_metrics);

            log::info!(
                "Epoch {}/{}: Train: {} | Val: {}",
                epoch + 1,
                self.config.epochs,
                train_metrics,
                val_metrics
            );
        }

        Ok((self.model, history))
    }

    /// Train one epoch
    fn train_epoch(
        &mut self,
        loader: impl Iterator<Item = RepBatch<B>>,
        num_classes: usize,
    ) -> Metrics {
        let mut metrics = Metrics::new();

        for batch in loader {
            let batch_size = batch.values.dims()[0];

            // Forward pass
            let logits = self.model.forward(batch.values.clone());
            let probs = softmax(logits, 1);
            let loss = categorical_cross_entropy(probs.clone(), batch.targets.clone());

            // Get loss value before backward pass
            let loss_val: f32 = loss.clone().into_scalar().elem();

            // Backward pass
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);

            // Update weights
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            let correct = batch_correct(&probs, &batch.targets, num_classes);
            metrics.update(loss_val, correct, batch_size);
        }

        metrics
    }

    /// Validate one epoch (no gradient updates)
    fn validate_epoch(
        &self,
        loader: impl Iterator<Item = RepBatch<B>>,
        num_classes: usize,
    ) -> Metrics {
        let mut metrics = Metrics::new();

        for batch in loader {
            let batch_size = batch.values.dims()[0];

            let logits = self.model.forward(batch.values.clone());
            let probs = softmax(logits, 1);
            let loss = categorical_cross_entropy(probs.clone(), batch.targets.clone());
            let loss_val: f32 = loss.into_scalar().elem();

            let correct = batch_correct(&probs, &batch.targets, num_classes);
            metrics.update(loss_val, correct, batch_size);
        }

        metrics
    }

    /// Get the current model
    pub fn model(&self) -> &RepNet<B> {
        &self.model
    }

    /// Get the model, consuming the trainer
    pub fn into_model(self) -> RepNet<B> {
        self.model
    }
}
