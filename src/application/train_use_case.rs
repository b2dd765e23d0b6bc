// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load training VCFs (+ false-positive sets)  (Layer 4 - data)
//   Step 2: Load eval VCFs, or reuse the training set   (Layer 4 - data)
//   Step 3: Build the encoder for the chosen network    (Layer 4 - data)
//   Step 4: Save config for inference                   (Layer 6 - infra)
//   Step 5: Build the network                           (Layer 5 - ml)
//   Step 6: Run training loop                           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::data::{
    dataset::{DatasetMode, VariantDataset},
    encoder::{PileupEncoder, PileupLayer, SummaryEncoder},
    loader::VariantDataLoader,
    vcf::{VariantSet, VcfReader},
};
use crate::domain::{traits::SampleEncoder, zygosity::ZYGOSITY_CLASSES};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    alexnet::AlexNetConfig,
    attention::AttentionKind,
    backend::{default_device, Device, InferBackend, TrainBackend},
    ports::{NeuralModule, ZygosityClassifier},
    rnn::ConsensusRnnConfig,
    trainer::{run_training, TrainReport},
};

/// Which network to train; also selects the sample encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkKind {
    /// CNN over pileup images
    AlexNet,
    /// Bidirectional GRU over per-position summaries
    ConsensusRnn,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to rebuild the encoder and network, saved
// as train_config.json next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub vcfs:                  Vec<PathBuf>,
    /// Records from these sets are always labelled NoVariant
    pub fp_vcfs:               Vec<PathBuf>,
    /// Evaluated every `eval_epoch_freq` epochs; empty reuses the training set
    pub eval_vcfs:             Vec<PathBuf>,
    /// Matched to VCF sample columns by index
    pub bams:                  Vec<PathBuf>,
    pub checkpoint_dir:        PathBuf,
    pub network:               NetworkKind,
    pub epochs:                usize,
    pub batch_size:            usize,
    pub lr:                    f64,
    pub seed:                  u64,
    pub log_step_freq:         usize,
    pub eval_epoch_freq:       usize,
    pub checkpoint_epoch_freq: usize,
    pub checkpoint_step_freq:  usize,
    pub checkpoints_to_keep:   usize,
    pub window_size:           usize,
    pub max_reads:             usize,
    pub pileup_layers:         Vec<PileupLayer>,
    pub hidden_width:          usize,
    pub rnn_hidden:            usize,
    pub rnn_layers:            usize,
    pub attention:             Option<AttentionKind>,
    pub dropout:               f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            vcfs:                  Vec::new(),
            fp_vcfs:               Vec::new(),
            eval_vcfs:             Vec::new(),
            bams:                  Vec::new(),
            checkpoint_dir:        PathBuf::from("checkpoints"),
            network:               NetworkKind::AlexNet,
            epochs:                10,
            batch_size:            32,
            lr:                    1e-4,
            seed:                  42,
            log_step_freq:         10,
            eval_epoch_freq:       1,
            checkpoint_epoch_freq: 1,
            checkpoint_step_freq:  0,
            checkpoints_to_keep:   5,
            window_size:           50,
            max_reads:             100,
            pileup_layers:         vec![
                PileupLayer::Reads,
                PileupLayer::BaseQuality,
                PileupLayer::MappingQuality,
                PileupLayer::Allele,
            ],
            hidden_width:          4096,
            rnn_hidden:            128,
            rnn_layers:            2,
            attention:             None,
            dropout:               0.5,
        }
    }
}

impl TrainConfig {
    /// Sample encoder matching the configured network.
    pub fn build_encoder(&self) -> Box<dyn SampleEncoder> {
        match self.network {
            NetworkKind::AlexNet => Box::new(PileupEncoder::new(
                self.pileup_layers.clone(),
                self.window_size,
                self.max_reads,
            )),
            NetworkKind::ConsensusRnn => Box::new(SummaryEncoder::new(self.window_size)),
        }
    }

    pub fn alexnet_config(&self, num_input_channels: usize) -> AlexNetConfig {
        AlexNetConfig::new(num_input_channels, ZYGOSITY_CLASSES.len())
            .with_hidden_width(self.hidden_width)
            .with_dropout(self.dropout)
    }

    pub fn rnn_config(&self) -> ConsensusRnnConfig {
        ConsensusRnnConfig::for_window(self.window_size, ZYGOSITY_CLASSES.len())
            .with_hidden_size(self.rnn_hidden)
            .with_num_layers(self.rnn_layers)
            .with_attention(self.attention)
    }

    /// Load `vcfs` (and optionally false-positive sets) into one dataset.
    pub fn load_dataset(
        &self,
        vcfs:    &[PathBuf],
        fp_vcfs: &[PathBuf],
        mode:    DatasetMode,
    ) -> Result<Arc<VariantDataset>> {
        let mut sources: Vec<VariantSet> = Vec::with_capacity(vcfs.len() + fp_vcfs.len());
        let tagged = vcfs.iter().map(|p| (p, false)).chain(fp_vcfs.iter().map(|p| (p, true)));
        for (path, is_fp) in tagged {
            let set = VcfReader::new(path, self.bams.clone(), is_fp)
                .load()
                .with_context(|| format!("Failed to load '{}'", path.display()))?;
            tracing::info!("Loaded {} records from '{}'{}", set.len(), path.display(), if is_fp { " (fp)" } else { "" });
            sources.push(set);
        }
        Ok(Arc::new(VariantDataset::new(sources, mode, self.build_encoder())))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Steps 1-3: datasets with the network's encoder ────────────────────
        let train = cfg.load_dataset(&cfg.vcfs, &cfg.fp_vcfs, DatasetMode::Train)?;
        tracing::info!("Training set: {} records", train.len());

        let eval = if cfg.eval_vcfs.is_empty() {
            Arc::clone(&train)
        } else {
            let eval = cfg.load_dataset(&cfg.eval_vcfs, &[], DatasetMode::Eval)?;
            tracing::info!("Eval set: {} records", eval.len());
            eval
        };

        self.run(train, eval)
    }

    /// Steps 4-6 over already-built datasets.
    pub fn run(&self, train: Arc<VariantDataset>, eval: Arc<VariantDataset>) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 4: save config for inference ─────────────────────────────────
        let mut ckpt = CheckpointManager::new(&cfg.checkpoint_dir, cfg.checkpoints_to_keep)?;
        ckpt.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Steps 5-6: build the network and train it ─────────────────────────
        let device = default_device();
        let [channels, _, _] = train.shape();
        match cfg.network {
            NetworkKind::AlexNet => {
                let model = cfg.alexnet_config(channels).init::<TrainBackend>(&device)?;
                fit(cfg, model, train, eval, device, &mut ckpt, &metrics)
            }
            NetworkKind::ConsensusRnn => {
                let model = cfg.rnn_config().init::<TrainBackend>(&device)?;
                fit(cfg, model, train, eval, device, &mut ckpt, &metrics)
            }
        }
    }
}

fn fit<M>(
    cfg:     &TrainConfig,
    model:   M,
    train:   Arc<VariantDataset>,
    eval:    Arc<VariantDataset>,
    device:  Device,
    ckpt:    &mut CheckpointManager,
    metrics: &MetricsLogger,
) -> Result<TrainReport>
where
    M: AutodiffModule<TrainBackend> + ZygosityClassifier<TrainBackend> + NeuralModule,
    M::InnerModule: ZygosityClassifier<InferBackend>,
{
    // the eval set may be smaller than a training batch
    let eval_batch = cfg.batch_size.min(eval.len());

    let train_loader = VariantDataLoader::<TrainBackend>::new(train, cfg.batch_size, true, cfg.seed, device.clone());
    let eval_loader  = VariantDataLoader::<InferBackend>::new(eval, eval_batch, false, cfg.seed, device);

    let (_model, report) = run_training(cfg, model, &train_loader, &eval_loader, ckpt, metrics)?;
    Ok(report)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{dataset::tests::fixture_dataset, encoder::SUMMARY_FEATURES};
    use std::fs;

    pub(crate) fn tiny_alexnet_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            checkpoint_dir:      dir.to_path_buf(),
            epochs:              2,
            batch_size:          8,
            hidden_width:        8,
            checkpoints_to_keep: 1,
            ..TrainConfig::default()
        }
    }

    /// Two-position window so the summary encoding is [1, 5, 10].
    pub(crate) fn tiny_rnn_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            network:     NetworkKind::ConsensusRnn,
            window_size: 2,
            rnn_hidden:  4,
            rnn_layers:  2,
            attention:   Some(AttentionKind::General),
            ..tiny_alexnet_config(dir)
        }
    }

    #[test]
    fn test_training_writes_checkpoints_config_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_alexnet_config(dir.path());
        let train = Arc::new(fixture_dataset(DatasetMode::Train, [1, 64, 64]));

        let report = TrainUseCase::new(cfg).run(Arc::clone(&train), train).unwrap();
        assert_eq!(report.history.len(), 2);
        // 19 records in batches of 8, two epochs
        assert_eq!(report.steps, 6);

        // only the newest epoch checkpoint survives retention
        assert!(dir.path().join("AlexNet-EPOCH-2.mpk.gz").exists());
        assert!(!dir.path().join("AlexNet-EPOCH-1.mpk.gz").exists());
        assert!(dir.path().join("train_config.json").exists());

        let csv = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_consensus_rnn_trains_with_attention() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_rnn_config(dir.path());
        let train = Arc::new(fixture_dataset(DatasetMode::Train, [1, 5, SUMMARY_FEATURES]));

        let report = TrainUseCase::new(cfg).run(Arc::clone(&train), train).unwrap();
        assert_eq!(report.steps, 6);
        assert!(report.history.iter().all(|m| m.eval.is_some()));
        assert!(dir.path().join("ConsensusRnn-EPOCH-2.mpk.gz").exists());
        assert!(!dir.path().join("ConsensusRnn-EPOCH-1.mpk.gz").exists());
    }

    #[test]
    fn test_rejects_incompatible_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_alexnet_config(dir.path());
        // too small for the AlexNet feature extractor
        let train = Arc::new(fixture_dataset(DatasetMode::Train, [1, 8, 8]));

        let err = TrainUseCase::new(cfg).run(Arc::clone(&train), train).unwrap_err();
        assert!(err.to_string().contains("AlexNet"));
    }

    #[test]
    fn test_rnn_shape_follows_window() {
        let cfg = TrainConfig {
            network: NetworkKind::ConsensusRnn,
            window_size: 5,
            ..TrainConfig::default()
        };
        assert_eq!(cfg.build_encoder().shape(), [1, 11, 10]);
        assert_eq!(cfg.rnn_config().sequence_length, 11);
    }

    #[test]
    fn test_config_json_uses_kebab_case_names() {
        let cfg = TrainConfig {
            network:   NetworkKind::ConsensusRnn,
            attention: Some(AttentionKind::General),
            ..TrainConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"consensus-rnn\""));
        assert!(json.contains("\"general\""));
        assert!(json.contains("\"base-quality\""));
    }
}
