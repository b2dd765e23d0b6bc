// ============================================================
// Layer 3 — Typed Errors
// ============================================================
// Library-level failures are typed so tests can match on the
// exact variant (e.g. FORMAT arity mismatch). The application
// and CLI layers wrap these in anyhow with extra context.

use std::path::PathBuf;

/// Failures while reading a VCF file.
#[derive(Debug, thiserror::Error)]
pub enum VcfError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Header {
        path:    PathBuf,
        line:    usize,
        message: String,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path:    PathBuf,
        line:    usize,
        message: String,
    },

    /// A sample column does not supply one value per FORMAT key.
    #[error(
        "{path}:{line}: FORMAT declares {format_fields} field(s) but sample '{sample}' has {values} value(s)"
    )]
    FormatArity {
        path:          PathBuf,
        line:          usize,
        sample:        String,
        format_fields: usize,
        values:        usize,
    },

    #[error("{path}: {bams} alignment file(s) given but the VCF has only {samples} sample(s)")]
    AlignmentCount {
        path:    PathBuf,
        bams:    usize,
        samples: usize,
    },
}

/// Failures while turning a variant into a tensor encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("no alignment file for variant {chrom}:{pos}")]
    MissingAlignment { chrom: String, pos: u64 },

    #[error("BAM index not found for '{0}' (expected .bam.bai or .bai)")]
    MissingIndex(PathBuf),

    #[error("contig '{0}' is not present in the BAM header")]
    UnknownContig(String),

    #[error("unknown pileup layer '{0}' (expected reads, base-quality, mapping-quality or allele)")]
    UnknownLayer(String),
}

/// Failures of the dataset loader.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("batch size {batch_size} is invalid for a dataset of {records} record(s)")]
    BatchSize { batch_size: usize, records: usize },

    #[error("record index {index} is out of range for a dataset of {records} record(s)")]
    OutOfRange { index: usize, records: usize },

    #[error("failed to encode record {index}: {source}")]
    Encode {
        index:  usize,
        #[source]
        source: EncodeError,
    },
}

/// Construction-time validation failures of network modules.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid attention type '{0}' (expected 'dot' or 'general')")]
    InvalidAttention(String),

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    #[error("{network} cannot accept encodings of shape {shape:?}: {reason}")]
    IncompatibleEncoding {
        network: &'static str,
        shape:   [usize; 3],
        reason:  String,
    },
}

/// Failures of the zygosity label decoder.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("class index {index} is out of range for {classes} zygosity classes")]
    OutOfRange { index: usize, classes: usize },
}
