// ============================================================
// Layer 3 — Variant Record Domain Type
// ============================================================
// One VCF data line in structured form:
//
//   #CHROM POS ID REF ALT QUAL FILTER INFO FORMAT SAMPLE...
//   1      139098 . CT T  50   .      DP=15 GT:GQ  0/1:50
//
// Sample columns are kept as one value per FORMAT key; the
// reader guarantees `samples[i].len() == format.len()`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// FILTER column state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStatus {
    /// `.` — no filters applied
    Missing,
    /// `PASS`
    Pass,
    /// Semicolon-separated names of the failed filters
    Failed(Vec<String>),
}

impl FilterStatus {
    pub fn parse(field: &str) -> Self {
        match field {
            "." => FilterStatus::Missing,
            "PASS" => FilterStatus::Pass,
            other => FilterStatus::Failed(other.split(';').map(str::to_string).collect()),
        }
    }
}

/// A parsed VCF data line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub chrom:      String,
    /// 1-based position of the first REF base
    pub pos:        u64,
    pub id:         Option<String>,
    pub ref_allele: String,
    /// Empty when ALT is `.`
    pub alt_alleles: Vec<String>,
    pub qual:       Option<f32>,
    pub filter:     FilterStatus,
    /// INFO entries in file order; flags have no value
    pub info:       IndexMap<String, Option<String>>,
    pub format:     Vec<String>,
    /// One entry per sample, each holding one value per FORMAT key
    pub samples:    Vec<Vec<String>>,
}

impl VariantRecord {
    /// Value of FORMAT key `key` for sample `sample`.
    pub fn sample_value(&self, sample: usize, key: &str) -> Option<&str> {
        let idx = self.format.iter().position(|k| k == key)?;
        self.samples.get(sample)?.get(idx).map(String::as_str)
    }

    /// Parsed `GT` of the given sample, if present.
    pub fn genotype(&self, sample: usize) -> Option<Genotype> {
        self.sample_value(sample, "GT").map(Genotype::parse)
    }

    pub fn is_snv(&self) -> bool {
        self.ref_allele.len() == 1
            && !self.alt_alleles.is_empty()
            && self.alt_alleles.iter().all(|a| a.len() == 1)
    }

    /// 0-based position, as used by htslib
    pub fn pos0(&self) -> u64 {
        self.pos.saturating_sub(1)
    }
}

/// A `GT` call such as `0/1`, `1|1`, `./.` or haploid `1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genotype {
    /// Allele indices; `None` is a missing call (`.`)
    pub alleles: Vec<Option<u32>>,
    pub phased:  bool,
}

impl Genotype {
    pub fn parse(gt: &str) -> Self {
        let phased = gt.contains('|');
        let alleles = gt
            .split(|c| c == '/' || c == '|')
            .map(|a| a.parse::<u32>().ok())
            .collect();
        Self { alleles, phased }
    }

    pub fn ploidy(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_missing(&self) -> bool {
        self.alleles.iter().all(Option::is_none)
    }
}
