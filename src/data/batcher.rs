// ============================================================
// Layer 4 — Variant Batcher
// ============================================================
// Implements Burn's Batcher trait to stack encoded variants
// into one device tensor.
//
//   Input:  N VariantSamples, each `c * h * w` floats
//   Output: encoding [N, c, h, w], labels [N] (train/eval only)
//
// Sequence encodings for the RNN use the same 4D layout with
// a single channel plane: [N, 1, width, features].

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::VariantSample;

/// A batch of encoded variants ready for the forward pass.
#[derive(Debug, Clone)]
pub struct VariantBatch<B: Backend> {
    /// Shape: [batch_size, channels, height, width]
    pub encoding: Tensor<B, 4>,

    /// Zygosity class per sample — shape: [batch_size].
    /// `None` in test mode, where labels are unknown.
    pub labels: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> VariantBatch<B> {
    pub fn len(&self) -> usize {
        self.encoding.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct VariantBatcher<B: Backend> {
    pub device: B::Device,
    /// `[channels, height, width]` of one sample
    pub shape:  [usize; 3],
}

impl<B: Backend> VariantBatcher<B> {
    pub fn new(device: B::Device, shape: [usize; 3]) -> Self {
        Self { device, shape }
    }
}

impl<B: Backend> Batcher<VariantSample, VariantBatch<B>> for VariantBatcher<B> {
    fn batch(&self, items: Vec<VariantSample>) -> VariantBatch<B> {
        let batch_size = items.len();
        let [c, h, w]  = self.shape;

        let labels: Option<Vec<i32>> = items
            .iter()
            .map(|s| s.label.map(|l| l as i32))
            .collect();

        let flat: Vec<f32> = items.into_iter().flat_map(|s| s.encoding).collect();
        let encoding = Tensor::<B, 4>::from_data(
            TensorData::new(flat, [batch_size, c, h, w]),
            &self.device,
        );

        let labels = labels.map(|l| Tensor::<B, 1, Int>::from_ints(l.as_slice(), &self.device));

        VariantBatch { encoding, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_labels() {
        let batcher = VariantBatcher::<TestBackend>::new(Default::default(), [2, 1, 3]);
        let items = vec![
            VariantSample { encoding: vec![1.0; 6], label: Some(2) },
            VariantSample { encoding: vec![2.0; 6], label: Some(0) },
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.encoding.dims(), [2, 2, 1, 3]);
        assert_eq!(batch.len(), 2);

        let labels: Vec<i64> = batch.labels.unwrap().into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![2, 0]);

        let values: Vec<f32> = batch.encoding.into_data().iter::<f32>().collect();
        assert_eq!(&values[..6], &[1.0; 6]);
        assert_eq!(&values[6..], &[2.0; 6]);
    }

    #[test]
    fn test_unlabelled_batch() {
        let batcher = VariantBatcher::<TestBackend>::new(Default::default(), [1, 1, 1]);
        let batch = batcher.batch(vec![VariantSample { encoding: vec![0.5], label: None }]);
        assert!(batch.labels.is_none());
        assert_eq!(batch.encoding.dims(), [1, 1, 1, 1]);
    }
}
