// ============================================================
// Layer 4 — Sample Encoders
// ============================================================
// Turn a variant plus its BAM evidence into a fixed-shape
// float tensor, one window of reference positions centred on
// the variant:
//
//   window = [pos0 - window_size, pos0 + window_size]   (inclusive)
//   width  = 2 * window_size + 1
//
// Columns falling before the contig start stay zero, so the
// variant is always column `window_size`.
//
// PileupEncoder  → [layers, max_reads, width]
//   One row per read (first `max_reads` reads in pileup order),
//   one plane per selected layer.
//
// SummaryEncoder → [1, width, 10]
//   Per position: A C G T deletion frequencies on the forward
//   strand, then the same five on the reverse strand.
//
// BAM readers are opened lazily and cached per path, so a
// dataset spanning several files only pays for each index once.

use rust_htslib::bam::{self, pileup::Indel, Read};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::domain::error::EncodeError;
use crate::domain::traits::SampleEncoder;
use crate::domain::variant::VariantRecord;

const MAX_PILEUP_DEPTH: u32 = 100_000;
const QUALITY_CAP: f32 = 60.0;

/// Features per position in a summary encoding.
pub const SUMMARY_FEATURES: usize = 10;

// ─── Pileup layers ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PileupLayer {
    /// Read base, A=0.25 C=0.5 G=0.75 T=1.0
    Reads,
    /// Phred base quality scaled to [0, 1]
    BaseQuality,
    /// Mapping quality scaled to [0, 1]
    MappingQuality,
    /// 1.0 where the read supports an alternate allele at the variant
    Allele,
}

impl FromStr for PileupLayer {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reads"           => Ok(PileupLayer::Reads),
            "base-quality"    => Ok(PileupLayer::BaseQuality),
            "mapping-quality" => Ok(PileupLayer::MappingQuality),
            "allele"          => Ok(PileupLayer::Allele),
            other             => Err(EncodeError::UnknownLayer(other.to_string())),
        }
    }
}

fn base_value(base: u8) -> f32 {
    match base.to_ascii_uppercase() {
        b'A' => 0.25,
        b'C' => 0.5,
        b'G' => 0.75,
        b'T' => 1.0,
        _ => 0.0,
    }
}

fn scale_quality(q: u8) -> f32 {
    (q as f32).min(QUALITY_CAP) / QUALITY_CAP
}

/// Whether a read aligned at the variant column carries an ALT allele.
fn supports_alt(record: &VariantRecord, base: Option<u8>, indel: Indel) -> bool {
    let ref_len = record.ref_allele.len();
    record.alt_alleles.iter().any(|alt| {
        let diff = alt.len() as i64 - ref_len as i64;
        match indel {
            Indel::Ins(n) => diff > 0 && n as i64 == diff,
            Indel::Del(n) => diff < 0 && n as i64 == -diff,
            Indel::None => {
                diff == 0
                    && base.is_some_and(|b| alt.as_bytes().first().is_some_and(|a| a.eq_ignore_ascii_case(&b)))
            }
        }
    })
}

// ─── Shared BAM access ────────────────────────────────────────────────────────
#[derive(Default)]
struct BamCache {
    readers: HashMap<PathBuf, bam::IndexedReader>,
}

impl BamCache {
    fn reader(&mut self, path: &Path) -> Result<&mut bam::IndexedReader, EncodeError> {
        if !self.readers.contains_key(path) {
            let bai     = PathBuf::from(format!("{}.bai", path.display()));
            let alt_bai = path.with_extension("bai");
            let reader = if bai.exists() {
                bam::IndexedReader::from_path_and_index(path, &bai)?
            } else if alt_bai.exists() {
                bam::IndexedReader::from_path_and_index(path, &alt_bai)?
            } else {
                return Err(EncodeError::MissingIndex(path.to_path_buf()));
            };
            tracing::debug!("Opened alignment file '{}'", path.display());
            self.readers.insert(path.to_path_buf(), reader);
        }
        self.readers
            .get_mut(path)
            .ok_or_else(|| EncodeError::MissingIndex(path.to_path_buf()))
    }

    /// Position the reader on the window around `record`.
    /// Returns the 0-based window start, negative when the window
    /// overhangs the contig start.
    fn fetch_window(
        &mut self,
        path:        &Path,
        record:      &VariantRecord,
        window_size: usize,
    ) -> Result<(&mut bam::IndexedReader, i64), EncodeError> {
        let reader = self.reader(path)?;
        let tid = reader
            .header()
            .tid(record.chrom.as_bytes())
            .ok_or_else(|| EncodeError::UnknownContig(record.chrom.clone()))?;
        let start = record.pos0() as i64 - window_size as i64;
        let end   = record.pos0() as i64 + window_size as i64 + 1;
        reader.fetch((tid, start.max(0), end))?;
        Ok((reader, start))
    }
}

/// Column of reference position `pos` in a window starting at
/// `start`, or `None` outside the window.
fn window_column(pos: u32, start: i64, width: usize) -> Option<usize> {
    let col = pos as i64 - start;
    (0..width as i64).contains(&col).then_some(col as usize)
}

// ─── PileupEncoder ────────────────────────────────────────────────────────────
/// Image-like read pileup for the CNN.
pub struct PileupEncoder {
    layers:      Vec<PileupLayer>,
    window_size: usize,
    max_reads:   usize,
    bams:        BamCache,
}

impl PileupEncoder {
    pub fn new(layers: Vec<PileupLayer>, window_size: usize, max_reads: usize) -> Self {
        Self { layers, window_size, max_reads, bams: BamCache::default() }
    }

    fn width(&self) -> usize {
        2 * self.window_size + 1
    }
}

impl SampleEncoder for PileupEncoder {
    fn shape(&self) -> [usize; 3] {
        [self.layers.len(), self.max_reads, self.width()]
    }

    fn encode(
        &mut self,
        record:    &VariantRecord,
        alignment: Option<&Path>,
    ) -> Result<Vec<f32>, EncodeError> {
        let path = alignment.ok_or_else(|| EncodeError::MissingAlignment {
            chrom: record.chrom.clone(),
            pos:   record.pos,
        })?;

        let width     = self.width();
        let max_reads = self.max_reads;
        let plane     = max_reads * width;
        let centre    = self.window_size;
        let mut out   = vec![0.0f32; self.layers.len() * plane];
        let mut rows: HashMap<Vec<u8>, usize> = HashMap::new();

        let (reader, start) = self.bams.fetch_window(path, record, self.window_size)?;
        let mut pileups = reader.pileup();
        pileups.set_max_depth(MAX_PILEUP_DEPTH);

        for pileup in pileups {
            let pileup = pileup?;
            let Some(col) = window_column(pileup.pos(), start, width) else {
                continue;
            };

            for aln in pileup.alignments() {
                if aln.is_refskip() {
                    continue;
                }
                let read = aln.record();
                let next_row = rows.len();
                let row = *rows.entry(read.qname().to_vec()).or_insert(next_row);
                if row >= max_reads {
                    continue;
                }

                let base = if aln.is_del() { None } else { aln.qpos().map(|q| read.seq()[q]) };
                let qual = aln.qpos().and_then(|q| read.qual().get(q).copied());

                for (l, layer) in self.layers.iter().enumerate() {
                    let value = match layer {
                        PileupLayer::Reads          => base.map(base_value).unwrap_or(0.0),
                        PileupLayer::BaseQuality    => qual.map(scale_quality).unwrap_or(0.0),
                        PileupLayer::MappingQuality => scale_quality(read.mapq()),
                        PileupLayer::Allele => {
                            if col == centre && supports_alt(record, base, aln.indel()) {
                                1.0
                            } else {
                                0.0
                            }
                        }
                    };
                    out[l * plane + row * width + col] = value;
                }
            }
        }

        if rows.len() > max_reads {
            tracing::trace!(
                "{}:{} has {} reads, pileup truncated to {}",
                record.chrom, record.pos, rows.len(), max_reads
            );
        }
        Ok(out)
    }
}

// ─── SummaryEncoder ───────────────────────────────────────────────────────────
/// Per-position base frequencies for the consensus RNN.
pub struct SummaryEncoder {
    window_size: usize,
    bams:        BamCache,
}

impl SummaryEncoder {
    pub fn new(window_size: usize) -> Self {
        Self { window_size, bams: BamCache::default() }
    }

    fn width(&self) -> usize {
        2 * self.window_size + 1
    }
}

fn summary_feature(base: Option<u8>) -> Option<usize> {
    match base.map(|b| b.to_ascii_uppercase()) {
        Some(b'A') => Some(0),
        Some(b'C') => Some(1),
        Some(b'G') => Some(2),
        Some(b'T') => Some(3),
        None => Some(4),
        Some(_) => None,
    }
}

impl SampleEncoder for SummaryEncoder {
    fn shape(&self) -> [usize; 3] {
        [1, self.width(), SUMMARY_FEATURES]
    }

    fn encode(
        &mut self,
        record:    &VariantRecord,
        alignment: Option<&Path>,
    ) -> Result<Vec<f32>, EncodeError> {
        let path = alignment.ok_or_else(|| EncodeError::MissingAlignment {
            chrom: record.chrom.clone(),
            pos:   record.pos,
        })?;

        let width   = self.width();
        let mut out = vec![0.0f32; width * SUMMARY_FEATURES];

        let (reader, start) = self.bams.fetch_window(path, record, self.window_size)?;
        let mut pileups = reader.pileup();
        pileups.set_max_depth(MAX_PILEUP_DEPTH);

        for pileup in pileups {
            let pileup = pileup?;
            let Some(col) = window_column(pileup.pos(), start, width) else {
                continue;
            };
            let row = &mut out[col * SUMMARY_FEATURES..(col + 1) * SUMMARY_FEATURES];

            let mut depth = 0usize;
            for aln in pileup.alignments() {
                if aln.is_refskip() {
                    continue;
                }
                let read = aln.record();
                let base = if aln.is_del() { None } else { aln.qpos().map(|q| read.seq()[q]) };
                if let Some(feature) = summary_feature(base) {
                    let strand = if read.is_reverse() { 5 } else { 0 };
                    row[strand + feature] += 1.0;
                    depth += 1;
                }
            }
            if depth > 0 {
                row.iter_mut().for_each(|v| *v /= depth as f32);
            }
        }
        Ok(out)
    }
}
