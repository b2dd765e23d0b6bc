// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe variants and their labels.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only structs, enums, traits and the typed errors the
//     other layers return
//
// Everything above this layer (data, ml, application) speaks
// in terms of these types, so they stay testable without a
// BAM file or a tensor backend.

// Typed error enums shared by the data and ml layers
pub mod error;

// A parsed VCF data line and its genotype calls
pub mod variant;

// Zygosity categories, the label encoder and the decoder table
pub mod zygosity;

// Core abstractions (traits) that other layers implement
pub mod traits;
