// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The dataset only knows it needs "something that turns a
// variant into a fixed-shape vector of floats". Pileup images
// for the CNN and per-position summaries for the RNN both
// implement the same trait, and tests plug in a synthetic
// encoder without touching a BAM file.

use std::path::Path;

use crate::domain::error::EncodeError;
use crate::domain::variant::VariantRecord;

// ─── SampleEncoder ────────────────────────────────────────────────────────────
/// Converts one variant into a flat, row-major `f32` encoding.
///
/// Implementations:
///   - PileupEncoder  → `[layers, max_reads, 2*window+1]` read pileup
///   - SummaryEncoder → `[1, 2*window+1, 10]` strand-split base frequencies
pub trait SampleEncoder: Send {
    /// Shape of a single encoded sample as `[channels, height, width]`.
    /// `encode` must always return exactly `c * h * w` values.
    fn shape(&self) -> [usize; 3];

    /// Encode `record` using evidence from `alignment`, the BAM
    /// file matched to the record's first sample.
    fn encode(
        &mut self,
        record:    &VariantRecord,
        alignment: Option<&Path>,
    ) -> Result<Vec<f32>, EncodeError>;
}
