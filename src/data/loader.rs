// ============================================================
// Layer 4 — Variant Data Loader
// ============================================================
// Feeds batches to the training / inference loops.
//
// Each call to `iter()` is one epoch:
//   1. build the visiting order 0..len
//   2. if shuffling, permute it with a RNG seeded from
//      (seed + epoch) so every epoch sees a new order while the
//      run stays reproducible
//   3. lazily walk the order in chunks of `batch_size`,
//      encoding each sample and stacking the chunk with the
//      VariantBatcher
//
// The dataset itself is never reordered, so an unshuffled
// loader over the same dataset always yields source order.
// The last batch may be short; nothing is dropped or repeated.

use burn::{data::dataloader::batcher::Batcher, prelude::*};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::data::batcher::{VariantBatch, VariantBatcher};
use crate::data::dataset::VariantDataset;
use crate::domain::error::DataError;

pub struct VariantDataLoader<B: Backend> {
    dataset:    Arc<VariantDataset>,
    batcher:    VariantBatcher<B>,
    batch_size: usize,
    shuffle:    bool,
    seed:       u64,
    /// Number of epochs started so far
    epoch:      AtomicU64,
}

impl<B: Backend> VariantDataLoader<B> {
    /// Construction never fails; an unusable batch size is
    /// reported when iteration starts.
    pub fn new(
        dataset:    Arc<VariantDataset>,
        batch_size: usize,
        shuffle:    bool,
        seed:       u64,
        device:     B::Device,
    ) -> Self {
        let batcher = VariantBatcher::new(device, dataset.shape());
        Self { dataset, batcher, batch_size, shuffle, seed, epoch: AtomicU64::new(0) }
    }

    pub fn dataset(&self) -> &VariantDataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Start a new epoch.
    pub fn iter(&self) -> Result<VariantBatchIter<'_, B>, DataError> {
        let records = self.dataset.len();
        if self.batch_size == 0 || self.batch_size > records {
            return Err(DataError::BatchSize { batch_size: self.batch_size, records });
        }

        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        let mut order: Vec<usize> = (0..records).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }
        tracing::trace!("Epoch {} order starts with {:?}", epoch, &order[..order.len().min(8)]);

        Ok(VariantBatchIter { loader: self, order, cursor: 0 })
    }
}

pub struct VariantBatchIter<'a, B: Backend> {
    loader: &'a VariantDataLoader<B>,
    order:  Vec<usize>,
    cursor: usize,
}

impl<B: Backend> Iterator for VariantBatchIter<'_, B> {
    type Item = Result<VariantBatch<B>, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end   = (self.cursor + self.loader.batch_size).min(self.order.len());
        let chunk = &self.order[self.cursor..end];
        self.cursor = end;

        let samples: Result<Vec<_>, _> = chunk
            .iter()
            .map(|&i| self.loader.dataset.sample(i))
            .collect();
        Some(samples.map(|s| self.loader.batcher.batch(s)))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{tests::fixture_dataset, DatasetMode};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// Positions of the records in one epoch, as recovered from
    /// the PositionEncoder values.
    fn epoch_positions(loader: &VariantDataLoader<TestBackend>) -> Vec<u64> {
        loader
            .iter()
            .unwrap()
            .flat_map(|batch| {
                let batch = batch.unwrap();
                let n = batch.len();
                batch
                    .encoding
                    .reshape([n, 1])
                    .into_data()
                    .iter::<f32>()
                    .map(|v| v as u64)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn loader(shuffle: bool, batch_size: usize, mode: DatasetMode) -> VariantDataLoader<TestBackend> {
        let ds = Arc::new(fixture_dataset(mode, [1, 1, 1]));
        VariantDataLoader::new(ds, batch_size, shuffle, 7, Default::default())
    }

    #[test]
    fn test_unshuffled_preserves_order_across_epochs() {
        let l = loader(false, 4, DatasetMode::Eval);
        let expected: Vec<u64> = (0..l.dataset().len())
            .map(|i| l.dataset().record(i).unwrap().pos)
            .collect();
        assert_eq!(epoch_positions(&l), expected);
        assert_eq!(epoch_positions(&l), expected);
    }

    #[test]
    fn test_shuffled_is_a_permutation() {
        let l = loader(true, 4, DatasetMode::Train);
        let mut source: Vec<u64> = (0..l.dataset().len())
            .map(|i| l.dataset().record(i).unwrap().pos)
            .collect();

        let first  = epoch_positions(&l);
        let second = epoch_positions(&l);
        assert_ne!(first, source);
        assert_ne!(first, second);

        let (mut a, mut b) = (first.clone(), second.clone());
        a.sort_unstable();
        b.sort_unstable();
        source.sort_unstable();
        assert_eq!(a, source);
        assert_eq!(b, source);
    }

    #[test]
    fn test_last_batch_is_kept() {
        let l = loader(false, 4, DatasetMode::Train);
        let sizes: Vec<usize> = l.iter().unwrap().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![4, 4, 4, 4, 3]);
        assert_eq!(l.num_batches(), 5);
    }

    #[test]
    fn test_batch_size_checked_at_iteration() {
        // construction succeeds
        let l = loader(false, 100, DatasetMode::Train);
        match l.iter() {
            Err(DataError::BatchSize { batch_size, records }) => {
                assert_eq!(batch_size, 100);
                assert_eq!(records, 19);
            }
            _ => panic!("expected a batch size error"),
        }
    }

    #[test]
    fn test_test_mode_batches_have_no_labels() {
        let l = loader(false, 8, DatasetMode::Test);
        assert!(l.iter().unwrap().all(|b| b.unwrap().labels.is_none()));

        let l = loader(false, 8, DatasetMode::Eval);
        assert!(l.iter().unwrap().all(|b| b.unwrap().labels.is_some()));
    }
}
