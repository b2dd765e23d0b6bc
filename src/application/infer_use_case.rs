// ============================================================
// Layer 2 — InferUseCase
// ============================================================
// Calls zygosity for every record of one or more VCFs:
//
//   Step 1: Load train_config.json                 (Layer 6 - infra)
//   Step 2: Load VCFs in test mode, no labels      (Layer 4 - data)
//   Step 3: Rebuild the network, restore weights   (Layer 5 - ml)
//   Step 4: Predict class indices per batch        (Layer 5 - ml)
//   Step 5: Decode indices into zygosity labels    (Layer 3 - domain)

use anyhow::{anyhow, Result};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::application::train_use_case::{NetworkKind, TrainConfig};
use crate::data::dataset::{DatasetMode, VariantDataset};
use crate::domain::zygosity::{Zygosity, ZygosityLabelDecoder};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{default_device, InferBackend},
    inferencer::Inferencer,
};

/// One record with its predicted zygosity.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCall {
    pub chrom:       String,
    pub pos:         u64,
    pub ref_allele:  String,
    pub alt_alleles: Vec<String>,
    pub zygosity:    Zygosity,
}

impl fmt::Display for VariantCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alt = if self.alt_alleles.is_empty() { ".".to_string() } else { self.alt_alleles.join(",") };
        write!(f, "{}\t{}\t{}\t{}\t{}", self.chrom, self.pos, self.ref_allele, alt, self.zygosity)
    }
}

pub struct InferUseCase {
    config:     TrainConfig,
    ckpt:       CheckpointManager,
    strict:     bool,
    batch_size: Option<usize>,
}

impl InferUseCase {
    pub fn new(checkpoint_dir: impl AsRef<Path>, strict: bool) -> Result<Self> {
        let ckpt   = CheckpointManager::open(checkpoint_dir.as_ref())?;
        let config = ckpt.load_config()?;
        tracing::info!("Loaded {:?} run config from '{}'", config.network, ckpt.dir().display());
        Ok(Self { config, ckpt, strict, batch_size: None })
    }

    /// Override the batch size the network was trained with.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn execute(&self, vcfs: &[PathBuf], bams: &[PathBuf]) -> Result<Vec<VariantCall>> {
        let cfg = TrainConfig { bams: bams.to_vec(), ..self.config.clone() };
        let dataset = cfg.load_dataset(vcfs, &[], DatasetMode::Test)?;
        self.predict(dataset)
    }

    pub fn predict(&self, dataset: Arc<VariantDataset>) -> Result<Vec<VariantCall>> {
        if dataset.is_empty() {
            tracing::warn!("No records to call");
            return Ok(Vec::new());
        }

        let cfg        = &self.config;
        let batch_size = self.batch_size.unwrap_or(cfg.batch_size).min(dataset.len());
        let device     = default_device();
        let [channels, _, _] = dataset.shape();

        let batches = match cfg.network {
            NetworkKind::AlexNet => {
                let model = cfg.alexnet_config(channels).init::<InferBackend>(&device)?;
                Inferencer::<InferBackend, _>::from_checkpoint(&self.ckpt, model, device, self.strict)?
                    .predict(Arc::clone(&dataset), batch_size)?
            }
            NetworkKind::ConsensusRnn => {
                let model = cfg.rnn_config().init::<InferBackend>(&device)?;
                Inferencer::<InferBackend, _>::from_checkpoint(&self.ckpt, model, device, self.strict)?
                    .predict(Arc::clone(&dataset), batch_size)?
            }
        };

        let decoder = ZygosityLabelDecoder;
        batches
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, class)| {
                let record = dataset
                    .record(i)
                    .ok_or_else(|| anyhow!("prediction {i} has no matching record"))?;
                Ok(VariantCall {
                    chrom:       record.chrom.clone(),
                    pos:         record.pos,
                    ref_allele:  record.ref_allele.clone(),
                    alt_alleles: record.alt_alleles.clone(),
                    zygosity:    decoder.decode(class)?,
                })
            })
            .collect()
    }
}
