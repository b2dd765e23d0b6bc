// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network definitions and the train / infer loops.
//
//   ports.rs      — typed input/output port declarations and
//                   the ZygosityClassifier adapter trait
//
//   alexnet.rs    — CNN over pileup images
//                   [B, C, H, W] → [B, D]
//
//   rnn.rs        — stacked bidirectional GRU over read summaries
//                   [B, W, C] → [B, W, D]
//
//   attention.rs  — dot / general attention used by the RNN
//
//   backend.rs    — NdArray (default) or Wgpu backend aliases
//
//   trainer.rs    — forward pass, loss, backward pass, Adam
//                   step, evaluation and checkpoint cadence
//
//   inferencer.rs — restores a checkpoint and predicts a class
//                   index per record
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Port declarations shared by every network
pub mod ports;

/// AlexNet pileup classifier
pub mod alexnet;

/// Consensus bidirectional GRU
pub mod rnn;

/// Attention layer (dot / general)
pub mod attention;

/// Backend type aliases
pub mod backend;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

/// Inference engine — restores a checkpoint and predicts zygosity classes
pub mod inferencer;
