// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + evaluation loop with Adam and cross-entropy loss,
// generic over the network.
//
// Key Burn insight:
//   - Training uses B (Autodiff<…>) for gradients
//   - model.valid() returns the network on B::InnerBackend
//   - so the eval loader is built on the inner backend too
//   - argmax(1) returns [batch, 1]; flatten before .equal()
//
// Per step:   forward → loss → backward → Adam update
//             log every `log_step_freq` steps
//             checkpoint every `checkpoint_step_freq` steps
// Per epoch:  eval every `eval_epoch_freq` epochs
//             append a metrics.csv row
//             checkpoint every `checkpoint_epoch_freq` epochs
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, Result};
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::loader::VariantDataLoader;
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointTag},
    metrics::{EpochMetrics, EvalMetrics, MetricsLogger},
};
use crate::ml::ports::{NeuralModule, ZygosityClassifier};

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub steps:      usize,
    pub history:    Vec<EpochMetrics>,
    /// Epoch with the lowest eval loss, if any epoch was evaluated
    pub best_epoch: Option<usize>,
}

/// Lowest eval loss seen so far.
#[derive(Debug, Clone, Copy, Default)]
struct BestEval {
    epoch: Option<usize>,
    loss:  Option<f64>,
}

impl BestEval {
    /// Record `row` if it beats the current best; returns whether it did.
    fn update(&mut self, row: &EpochMetrics) -> bool {
        let improved = match self.loss {
            None       => row.eval.is_some_and(|e| !e.loss.is_nan()),
            Some(best) => row.is_improvement(best),
        };
        if improved {
            self.epoch = Some(row.epoch);
            self.loss  = row.eval.map(|e| e.loss);
        }
        improved
    }
}

/// True when a 1-based counter hits a non-zero frequency.
fn due(counter: usize, freq: usize) -> bool {
    freq > 0 && counter % freq == 0
}

pub fn run_training<B, M>(
    cfg:          &TrainConfig,
    mut model:    M,
    train_loader: &VariantDataLoader<B>,
    eval_loader:  &VariantDataLoader<B::InnerBackend>,
    ckpt:         &mut CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<(M, TrainReport)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ZygosityClassifier<B> + NeuralModule,
    M::InnerModule: ZygosityClassifier<B::InnerBackend>,
{
    model.check_sample_shape(train_loader.dataset().shape())?;
    tracing::info!("Training {}", M::describe());

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
    let mut step  = 0usize;
    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best    = BestEval::default();

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter()? {
            let batch  = batch?;
            let labels = batch
                .labels
                .ok_or_else(|| anyhow!("training batch carries no labels"))?;

            let logits = model.classify(batch.encoding);
            let loss   = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits, labels);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;
            step     += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);

            if due(step, cfg.log_step_freq) {
                tracing::info!("epoch {} step {} loss={:.4}", epoch, step, loss_val);
            }
            if due(step, cfg.checkpoint_step_freq) {
                ckpt.save::<B, M>(&model, CheckpointTag::Step(step))?;
            }
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

        // ── Evaluation phase ──────────────────────────────────────────────────
        // model.valid() drops autodiff and disables dropout
        let eval = if due(epoch, cfg.eval_epoch_freq) {
            Some(evaluate(&model.valid(), eval_loader)?)
        } else {
            None
        };

        match eval {
            Some(e) => tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | eval_loss={:.4} | eval_acc={:.1}%",
                epoch, cfg.epochs, train_loss, e.loss, e.accuracy * 100.0,
            ),
            None => tracing::info!("Epoch {:>3}/{} | train_loss={:.4}", epoch, cfg.epochs, train_loss),
        }

        let row = EpochMetrics::new(epoch, train_loss, eval);
        if best.update(&row) {
            tracing::info!("New best eval loss at epoch {}", epoch);
        }
        metrics.log(&row)?;
        history.push(row);

        if due(epoch, cfg.checkpoint_epoch_freq) {
            ckpt.save::<B, M>(&model, CheckpointTag::Epoch(epoch))?;
        }
    }

    tracing::info!("Training complete after {} steps", step);
    Ok((model, TrainReport { steps: step, history, best_epoch: best.epoch }))
}

/// Mean batch loss and accuracy over one pass of a labelled loader.
pub fn evaluate<B, M>(model: &M, loader: &VariantDataLoader<B>) -> Result<EvalMetrics>
where
    B: Backend,
    M: ZygosityClassifier<B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut correct  = 0usize;
    let mut total    = 0usize;

    for batch in loader.iter()? {
        let batch  = batch?;
        let labels = batch
            .labels
            .ok_or_else(|| anyhow!("evaluation batch carries no labels"))?;

        let logits = model.classify(batch.encoding);
        let ce     = CrossEntropyLossConfig::new().init(&logits.device());
        loss_sum  += ce.forward(logits.clone(), labels.clone()).into_scalar().elem::<f64>();
        batches   += 1;

        // argmax(1) returns shape [batch, 1] — flatten to [batch]
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        total   += labels.dims()[0];
        correct += predicted.equal(labels).int().sum().into_scalar().elem::<i64>() as usize;
    }

    Ok(EvalMetrics {
        loss:     if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
        accuracy: if total > 0 { correct as f64 / total as f64 } else { 0.0 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_frequencies() {
        assert!(due(4, 2));
        assert!(!due(3, 2));
        // zero disables
        assert!(!due(4, 0));
    }

    fn row(epoch: usize, eval_loss: Option<f64>) -> EpochMetrics {
        EpochMetrics::new(epoch, 1.0, eval_loss.map(|loss| EvalMetrics { loss, accuracy: 0.5 }))
    }

    #[test]
    fn test_best_eval_tracks_lowest_loss() {
        let mut best = BestEval::default();
        assert!(!best.update(&row(1, None)));
        assert!(best.update(&row(2, Some(0.9))));
        assert!(!best.update(&row(3, Some(1.2))));
        assert!(!best.update(&row(4, None)));
        assert!(best.update(&row(5, Some(0.4))));
        assert_eq!(best.epoch, Some(5));
    }

    #[test]
    fn test_nan_loss_is_never_best() {
        let mut best = BestEval::default();
        assert!(!best.update(&row(1, Some(f64::NAN))));
        assert_eq!(best.epoch, None);
    }
}
