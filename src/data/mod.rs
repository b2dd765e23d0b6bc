// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from VCF/BAM files to device-ready tensor batches.
//
//   VCF (+ .gz)
//       │
//       ▼
//   VcfReader          → validated VariantRecords per file
//       │
//       ▼
//   VariantDataset     → indexes all sources, labels records
//       │                 (train/eval) and encodes on demand
//       ▼
//   SampleEncoder      → pileup image or per-position summary
//       │                 read from the matching BAM
//       ▼
//   VariantBatcher     → stacks samples into [N, C, H, W]
//       │
//       ▼
//   VariantDataLoader  → per-epoch order, optional shuffle
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// VCF parsing and FORMAT arity validation
pub mod vcf;

/// Pileup and summary encoders over BAM files
pub mod encoder;

/// Record index, labels and lazy encoding
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Epoch iteration, shuffling and batch-size checks
pub mod loader;
