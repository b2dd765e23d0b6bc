// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains a network on labelled VCFs + BAMs
//   2. `infer` — restores a checkpoint and prints one
//                `chrom pos ref alt zygosity` line per record
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InferArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "variant-zygosity",
    version,
    about = "Train CNN / RNN zygosity classifiers on VCF + BAM data, then call zygosity."
)]
pub struct Cli {
    /// The subcommand to run (train or infer)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Infer(args) => run_infer(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on {} VCF(s)", args.vcfs.len() + args.fp_vcfs.len());
    let checkpoint_dir = args.checkpoint_dir.clone();

    let report = TrainUseCase::new(args.into()).execute()?;

    match report.history.last().and_then(|m| m.eval) {
        Some(e) => println!(
            "Training complete after {} steps: eval_loss={:.4} eval_acc={:.1}%",
            report.steps, e.loss, e.accuracy * 100.0
        ),
        None => println!("Training complete after {} steps.", report.steps),
    }
    if let Some(epoch) = report.best_epoch {
        println!("Best eval loss at epoch {epoch}");
    }
    println!("Checkpoints saved to '{}'", checkpoint_dir.display());
    Ok(())
}

fn run_infer(args: InferArgs) -> Result<()> {
    use crate::application::infer_use_case::InferUseCase;

    let mut use_case = InferUseCase::new(&args.checkpoint_dir, args.strict)?;
    if let Some(batch_size) = args.batch_size {
        use_case = use_case.with_batch_size(batch_size);
    }

    for call in use_case.execute(&args.vcfs, &args.bams)? {
        println!("{call}");
    }
    Ok(())
}
