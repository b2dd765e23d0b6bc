// ============================================================
// Layer 3 — Zygosity Labels
// ============================================================
// The classifier predicts one of three zygosity classes.
// The class table is fixed and shared by training (label
// encoder) and inference (label decoder):
//
//   index 0 → NoVariant     (0/0, no-call, haploid, false positive)
//   index 1 → Homozygous    (1/1, 2/2, ...)
//   index 2 → Heterozygous  (0/1, 1/2, ...)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::LabelError;
use crate::domain::variant::{Genotype, VariantRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zygosity {
    NoVariant,
    Homozygous,
    Heterozygous,
}

/// Class table, indexed by class id.
pub const ZYGOSITY_CLASSES: [Zygosity; 3] =
    [Zygosity::NoVariant, Zygosity::Homozygous, Zygosity::Heterozygous];

impl Zygosity {
    pub fn class_index(self) -> usize {
        match self {
            Zygosity::NoVariant    => 0,
            Zygosity::Homozygous   => 1,
            Zygosity::Heterozygous => 2,
        }
    }

    /// Derive zygosity from a genotype call.
    /// Haploid and partially missing calls have no diploid zygosity.
    pub fn from_genotype(gt: &Genotype) -> Self {
        if gt.ploidy() < 2 || gt.alleles.iter().any(Option::is_none) {
            return Zygosity::NoVariant;
        }
        let alleles: Vec<u32> = gt.alleles.iter().flatten().copied().collect();
        if alleles.iter().all(|&a| a == 0) {
            Zygosity::NoVariant
        } else if alleles.windows(2).all(|w| w[0] == w[1]) {
            Zygosity::Homozygous
        } else {
            Zygosity::Heterozygous
        }
    }
}

impl fmt::Display for Zygosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Zygosity::NoVariant    => "no_variant",
            Zygosity::Homozygous   => "homozygous",
            Zygosity::Heterozygous => "heterozygous",
        };
        f.write_str(s)
    }
}

/// Assigns a training label to a record.
/// Records from a false-positive set are always NoVariant.
pub struct ZygosityLabelEncoder;

impl ZygosityLabelEncoder {
    pub fn label(record: &VariantRecord, is_fp: bool) -> Zygosity {
        if is_fp {
            return Zygosity::NoVariant;
        }
        record
            .genotype(0)
            .map(|gt| Zygosity::from_genotype(&gt))
            .unwrap_or(Zygosity::NoVariant)
    }
}

/// Maps predicted class indices back to zygosity categories.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZygosityLabelDecoder;

impl ZygosityLabelDecoder {
    pub fn decode(&self, index: usize) -> Result<Zygosity, LabelError> {
        ZYGOSITY_CLASSES
            .get(index)
            .copied()
            .ok_or(LabelError::OutOfRange { index, classes: ZYGOSITY_CLASSES.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zyg(gt: &str) -> Zygosity {
        Zygosity::from_genotype(&Genotype::parse(gt))
    }

    #[test]
    fn test_genotype_strings_map_to_expected_labels() {
        assert_eq!(zyg("0/1"), Zygosity::Heterozygous);
        assert_eq!(zyg("1/1"), Zygosity::Homozygous);
        assert_eq!(zyg("1"),   Zygosity::NoVariant);
        assert_eq!(zyg("0/0"), Zygosity::NoVariant);
        assert_eq!(zyg("./."), Zygosity::NoVariant);
        assert_eq!(zyg("1|2"), Zygosity::Heterozygous);
        assert_eq!(zyg("2/2"), Zygosity::Homozygous);
    }

    #[test]
    fn test_decoder_follows_class_table() {
        let d = ZygosityLabelDecoder;
        for z in ZYGOSITY_CLASSES {
            assert_eq!(d.decode(z.class_index()), Ok(z));
        }
        assert_eq!(d.decode(0).map(|z| z.to_string()), Ok("no_variant".to_string()));
    }

    #[test]
    fn test_decoder_rejects_out_of_range() {
        let d = ZygosityLabelDecoder;
        assert_eq!(d.decode(3), Err(LabelError::OutOfRange { index: 3, classes: 3 }));
    }
}
