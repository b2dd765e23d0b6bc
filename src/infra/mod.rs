// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by both the trainer and the
// inference workflow:
//
//   checkpoint.rs — Saving and loading network weights
//                   Uses Burn's CompactRecorder, keeps a
//                   manifest of retained checkpoints and
//                   saves/loads TrainConfig as JSON so
//                   inference can rebuild the network.
//
//   metrics.rs    — Training metrics logging
//                   Writes epoch-level loss and accuracy to
//                   a CSV file for later analysis.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Checkpoint saving, retention and restore
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
