use std::sync::Mutex;

use crate::domain::error::DataError;
use crate::domain::traits::SampleEncoder;
use crate::domain::variant::VariantRecord;
use crate::domain::zygosity::ZygosityLabelEncoder;
use crate::data::vcf::VariantSet;

/// What the dataset is used for. Test mode carries no labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetMode {
    Train,
    Eval,
    Test,
}

impl DatasetMode {
    pub fn has_labels(self) -> bool {
        !matches!(self, DatasetMode::Test)
    }
}

/// One encoded variant, flattened row-major to `shape`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSample {
    pub encoding: Vec<f32>,
    pub label:    Option<usize>,
}

/// Indexes every record of every source, in source order, and
/// encodes them on demand.
pub struct VariantDataset {
    sources: Vec<VariantSet>,
    /// (source index, record index) per dataset position
    index:   Vec<(usize, usize)>,
    mode:    DatasetMode,
    shape:   [usize; 3],
    encoder: Mutex<Box<dyn SampleEncoder>>,
}

impl VariantDataset {
    pub fn new(sources: Vec<VariantSet>, mode: DatasetMode, encoder: Box<dyn SampleEncoder>) -> Self {
        let index = sources
            .iter()
            .enumerate()
            .flat_map(|(s, set)| (0..set.len()).map(move |r| (s, r)))
            .collect();
        let shape = encoder.shape();
        Self { sources, index, mode, shape, encoder: Mutex::new(encoder) }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn mode(&self) -> DatasetMode {
        self.mode
    }

    /// `[channels, height, width]` of every sample
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn record(&self, index: usize) -> Option<&VariantRecord> {
        let &(s, r) = self.index.get(index)?;
        self.sources[s].get(r)
    }

    /// Encode the record at `index`, labelling it unless in test mode.
    pub fn sample(&self, index: usize) -> Result<VariantSample, DataError> {
        let records      = self.len();
        let out_of_range = || DataError::OutOfRange { index, records };
        let &(s, r) = self.index.get(index).ok_or_else(out_of_range)?;
        let set     = &self.sources[s];
        let record  = set.get(r).ok_or_else(out_of_range)?;

        let encoding = {
            let mut encoder = self.encoder.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            encoder
                .encode(record, set.primary_bam())
                .map_err(|source| DataError::Encode { index, source })?
        };

        let label = self
            .mode
            .has_labels()
            .then(|| ZygosityLabelEncoder::label(record, set.is_fp).class_index());

        Ok(VariantSample { encoding, label })
    }
}
