// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `infer`
// and all their configurable flags.
//
// clap's derive macros generate help text, errors for missing
// arguments and the string → value conversions.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::{NetworkKind, TrainConfig};
use crate::data::encoder::PileupLayer;
use crate::ml::attention::AttentionKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a zygosity network on labelled VCFs and their BAMs
    Train(TrainArgs),

    /// Call zygosity for every record using a trained checkpoint
    Infer(InferArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkArg {
    Alexnet,
    ConsensusRnn,
}

impl From<NetworkArg> for NetworkKind {
    fn from(n: NetworkArg) -> Self {
        match n {
            NetworkArg::Alexnet      => NetworkKind::AlexNet,
            NetworkArg::ConsensusRnn => NetworkKind::ConsensusRnn,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionArg {
    Dot,
    General,
}

impl From<AttentionArg> for AttentionKind {
    fn from(a: AttentionArg) -> Self {
        match a {
            AttentionArg::Dot     => AttentionKind::Dot,
            AttentionArg::General => AttentionKind::General,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerArg {
    Reads,
    BaseQuality,
    MappingQuality,
    Allele,
}

impl From<LayerArg> for PileupLayer {
    fn from(l: LayerArg) -> Self {
        match l {
            LayerArg::Reads          => PileupLayer::Reads,
            LayerArg::BaseQuality    => PileupLayer::BaseQuality,
            LayerArg::MappingQuality => PileupLayer::MappingQuality,
            LayerArg::Allele         => PileupLayer::Allele,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Labelled VCF files (plain or gzip compressed)
    #[arg(long = "vcf", required = true, num_args = 1..)]
    pub vcfs: Vec<PathBuf>,

    /// False-positive VCF sets; every record is labelled no_variant
    #[arg(long = "fp-vcf", num_args = 1..)]
    pub fp_vcfs: Vec<PathBuf>,

    /// VCFs evaluated during training (defaults to the training set)
    #[arg(long = "eval-vcf", num_args = 1..)]
    pub eval_vcfs: Vec<PathBuf>,

    /// Indexed BAM files, matched to the VCF sample columns in order
    #[arg(long = "bam", required = true, num_args = 1..)]
    pub bams: Vec<PathBuf>,

    /// Directory for checkpoints, run config and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = NetworkArg::Alexnet)]
    pub network: NetworkArg,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Seed for the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log the training loss every N steps
    #[arg(long, default_value_t = 10)]
    pub log_step_freq: usize,

    /// Evaluate every N epochs
    #[arg(long, default_value_t = 1)]
    pub eval_epoch_freq: usize,

    /// Checkpoint every N epochs (0 disables)
    #[arg(long, default_value_t = 1)]
    pub checkpoint_epoch_freq: usize,

    /// Checkpoint every N optimizer steps (0 disables)
    #[arg(long, default_value_t = 0)]
    pub checkpoint_step_freq: usize,

    /// Keep at most N checkpoints on disk (0 keeps all)
    #[arg(long, default_value_t = 5)]
    pub checkpoints_to_keep: usize,

    /// Bases on each side of the variant; encodings are 2·N+1 wide
    #[arg(long, default_value_t = 50)]
    pub window_size: usize,

    /// Pileup rows (reads) per sample
    #[arg(long, default_value_t = 100)]
    pub max_reads: usize,

    /// Pileup layers, one channel each
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [LayerArg::Reads, LayerArg::BaseQuality, LayerArg::MappingQuality, LayerArg::Allele]
    )]
    pub pileup_layers: Vec<LayerArg>,

    /// Width of the AlexNet fully connected layers
    #[arg(long, default_value_t = 4096)]
    pub hidden_width: usize,

    /// GRU hidden units per direction
    #[arg(long, default_value_t = 128)]
    pub rnn_hidden: usize,

    /// Stacked bidirectional GRU layers
    #[arg(long, default_value_t = 2)]
    pub rnn_layers: usize,

    /// Self-attention over the GRU output
    #[arg(long, value_enum)]
    pub attention: Option<AttentionArg>,

    /// Dropout probability in the AlexNet classifier
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            vcfs:                  a.vcfs,
            fp_vcfs:               a.fp_vcfs,
            eval_vcfs:             a.eval_vcfs,
            bams:                  a.bams,
            checkpoint_dir:        a.checkpoint_dir,
            network:               a.network.into(),
            epochs:                a.epochs,
            batch_size:            a.batch_size,
            lr:                    a.lr,
            seed:                  a.seed,
            log_step_freq:         a.log_step_freq,
            eval_epoch_freq:       a.eval_epoch_freq,
            checkpoint_epoch_freq: a.checkpoint_epoch_freq,
            checkpoint_step_freq:  a.checkpoint_step_freq,
            checkpoints_to_keep:   a.checkpoints_to_keep,
            window_size:           a.window_size,
            max_reads:             a.max_reads,
            pileup_layers:         a.pileup_layers.into_iter().map(Into::into).collect(),
            hidden_width:          a.hidden_width,
            rnn_hidden:            a.rnn_hidden,
            rnn_layers:            a.rnn_layers,
            attention:             a.attention.map(Into::into),
            dropout:               a.dropout,
        }
    }
}

/// All arguments for the `infer` command
#[derive(Args, Debug)]
pub struct InferArgs {
    /// VCF files whose records should be called
    #[arg(long = "vcf", required = true, num_args = 1..)]
    pub vcfs: Vec<PathBuf>,

    /// Indexed BAM files, matched to the VCF sample columns in order
    #[arg(long = "bam", required = true, num_args = 1..)]
    pub bams: Vec<PathBuf>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Defaults to the batch size used for training
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Abort when the checkpoint cannot be restored
    #[arg(long)]
    pub strict: bool,
}
