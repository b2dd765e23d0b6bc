// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs a trained network over a test-mode dataset.
//
//   restore weights (strict or best-effort)
//   → unshuffled loader, so predictions follow record order
//   → classify each batch, argmax over the zygosity logits
//   → one Vec<usize> of class indices per batch

use anyhow::Result;
use burn::prelude::*;
use std::sync::Arc;

use crate::data::{dataset::VariantDataset, loader::VariantDataLoader};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::ports::ZygosityClassifier;

pub struct Inferencer<B: Backend, M> {
    model:  M,
    device: B::Device,
}

impl<B, M> Inferencer<B, M>
where
    B: Backend,
    M: Module<B> + ZygosityClassifier<B>,
{
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Restore the latest checkpoint into a freshly built network.
    /// With `strict` unset a missing or unreadable checkpoint only
    /// produces a warning.
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        model:  M,
        device: B::Device,
        strict: bool,
    ) -> Result<Self> {
        let model = ckpt.restore::<B, M>(model, &device, strict)?;
        Ok(Self::new(model, device))
    }

    pub fn predict(&self, dataset: Arc<VariantDataset>, batch_size: usize) -> Result<Vec<Vec<usize>>> {
        self.model.check_sample_shape(dataset.shape())?;

        let loader = VariantDataLoader::<B>::new(dataset, batch_size, false, 0, self.device.clone());
        let mut predictions = Vec::with_capacity(loader.num_batches());

        for batch in loader.iter()? {
            let batch = batch?;
            let classes: Vec<usize> = self
                .model
                .classify(batch.encoding)
                .argmax(1)
                .flatten::<1>(0, 1)
                .into_data()
                .iter::<i64>()
                .map(|c| c as usize)
                .collect();
            tracing::debug!("Predicted batch of {}", classes.len());
            predictions.push(classes);
        }

        Ok(predictions)
    }
}
