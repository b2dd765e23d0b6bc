// ============================================================
// Layer 4 — VCF Reader
// ============================================================
// Reads a VCF (plain text or gzip/bgzip compressed) into an
// ordered list of VariantRecords.
//
// Column contract of the header line:
//   #CHROM POS ID REF ALT QUAL FILTER INFO [FORMAT SAMPLE...]
//
// Every sample column must supply exactly one colon-delimited
// value per FORMAT key. The first row that violates this
// aborts the whole load: a file is either fully usable or
// not usable at all.

use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use crate::domain::error::VcfError;
use crate::domain::variant::{FilterStatus, VariantRecord};

const FIXED_COLUMNS: [&str; 8] = ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];

/// All records of one VCF plus the context needed to label and
/// encode them.
#[derive(Debug, Clone)]
pub struct VariantSet {
    pub path:         PathBuf,
    pub meta_lines:   Vec<String>,
    pub sample_names: Vec<String>,
    /// Alignment files, matched to samples by index
    pub bams:         Vec<PathBuf>,
    /// Whether every record in this file is a known false positive
    pub is_fp:        bool,
    records:          Vec<VariantRecord>,
}

impl VariantSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VariantRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantRecord> {
        self.records.iter()
    }

    /// Alignment file for the first sample, which drives encoding.
    pub fn primary_bam(&self) -> Option<&Path> {
        self.bams.first().map(PathBuf::as_path)
    }
}

/// Loads a VCF and pairs it with its alignment files.
pub struct VcfReader {
    vcf:   PathBuf,
    bams:  Vec<PathBuf>,
    is_fp: bool,
}

impl VcfReader {
    pub fn new(vcf: impl Into<PathBuf>, bams: Vec<PathBuf>, is_fp: bool) -> Self {
        Self { vcf: vcf.into(), bams, is_fp }
    }

    /// Read and validate the whole file.
    pub fn load(&self) -> Result<VariantSet, VcfError> {
        let reader = open_maybe_gzipped(&self.vcf)?;
        let mut set = parse_vcf(reader, &self.vcf)?;

        if !self.bams.is_empty() && self.bams.len() > set.sample_names.len() {
            return Err(VcfError::AlignmentCount {
                path:    self.vcf.clone(),
                bams:    self.bams.len(),
                samples: set.sample_names.len(),
            });
        }
        set.bams  = self.bams.clone();
        set.is_fp = self.is_fp;

        tracing::info!(
            "Loaded {} records from '{}' ({} sample(s), fp={})",
            set.len(),
            self.vcf.display(),
            set.sample_names.len(),
            self.is_fp
        );
        Ok(set)
    }
}

/// Open a file, transparently decompressing gzip/bgzip input.
fn open_maybe_gzipped(path: &Path) -> Result<Box<dyn BufRead>, VcfError> {
    let io_err = |source| VcfError::Io { path: path.to_path_buf(), source };

    let mut file = File::open(path).map_err(io_err)?;
    let mut magic = [0u8; 2];
    let gzipped = match file.read_exact(&mut magic) {
        Ok(()) => magic == [0x1f, 0x8b],
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(io_err(e)),
    };

    // Reopen rather than seek so the decoder sees the magic bytes
    let file = File::open(path).map_err(io_err)?;
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parse VCF text from any reader. `path` is only used in errors.
pub fn parse_vcf<R: BufRead>(reader: R, path: &Path) -> Result<VariantSet, VcfError> {
    let mut meta_lines   = Vec::new();
    let mut sample_names = Vec::new();
    let mut n_columns: Option<usize> = None;
    let mut records      = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|source| VcfError::Io { path: path.to_path_buf(), source })?;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') && n_columns.is_some() {
            let message = if records.is_empty() {
                "header line after the #CHROM header"
            } else {
                "header line after data lines"
            };
            return Err(VcfError::Header {
                path:    path.to_path_buf(),
                line:    line_no,
                message: message.to_string(),
            });
        }
        if line.starts_with("##") {
            meta_lines.push(line.to_string());
            continue;
        }
        if line.starts_with('#') {
            let columns = parse_header_line(line, path, line_no)?;
            sample_names = columns.iter().skip(FIXED_COLUMNS.len() + 1).cloned().collect();
            n_columns = Some(columns.len());
            continue;
        }

        let Some(expected) = n_columns else {
            return Err(VcfError::Header {
                path:    path.to_path_buf(),
                line:    line_no,
                message: "data line found before the #CHROM header".to_string(),
            });
        };
        records.push(parse_record(line, expected, &sample_names, path, line_no)?);
    }

    if n_columns.is_none() {
        return Err(VcfError::Header {
            path:    path.to_path_buf(),
            line:    0,
            message: "missing #CHROM header line".to_string(),
        });
    }

    Ok(VariantSet {
        path: path.to_path_buf(),
        meta_lines,
        sample_names,
        bams: Vec::new(),
        is_fp: false,
        records,
    })
}

fn parse_header_line(line: &str, path: &Path, line_no: usize) -> Result<Vec<String>, VcfError> {
    let columns: Vec<String> = line.split('\t').map(str::to_string).collect();
    let header_err = |message: String| VcfError::Header { path: path.to_path_buf(), line: line_no, message };

    for (i, expected) in FIXED_COLUMNS.iter().enumerate() {
        match columns.get(i) {
            Some(c) if c == expected => {}
            Some(c) => return Err(header_err(format!("column {} is '{}', expected '{}'", i + 1, c, expected))),
            None => return Err(header_err(format!("missing column '{expected}'"))),
        }
    }
    match columns.get(FIXED_COLUMNS.len()) {
        None => {}
        Some(c) if c == "FORMAT" => {
            if columns.len() == FIXED_COLUMNS.len() + 1 {
                return Err(header_err("FORMAT column present without sample columns".to_string()));
            }
        }
        Some(c) => return Err(header_err(format!("column 9 is '{c}', expected 'FORMAT'"))),
    }
    Ok(columns)
}

fn parse_record(
    line:         &str,
    n_columns:    usize,
    sample_names: &[String],
    path:         &Path,
    line_no:      usize,
) -> Result<VariantRecord, VcfError> {
    let parse_err = |message: String| VcfError::Parse { path: path.to_path_buf(), line: line_no, message };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != n_columns {
        return Err(parse_err(format!(
            "expected {} tab-separated columns, found {}",
            n_columns,
            fields.len()
        )));
    }

    let pos = fields[1]
        .parse::<u64>()
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| parse_err(format!("invalid position '{}'", fields[1])))?;

    let qual = match fields[5] {
        "." => None,
        q => Some(q.parse::<f32>().map_err(|_| parse_err(format!("invalid QUAL '{q}'")))?),
    };

    let alt_alleles = match fields[4] {
        "." => Vec::new(),
        alts => alts.split(',').map(str::to_string).collect(),
    };

    let mut info = IndexMap::new();
    if fields[7] != "." {
        for entry in fields[7].split(';').filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((k, v)) => info.insert(k.to_string(), Some(v.to_string())),
                None => info.insert(entry.to_string(), None),
            };
        }
    }

    let (format, samples) = if fields.len() > FIXED_COLUMNS.len() {
        let format: Vec<String> = fields[8].split(':').map(str::to_string).collect();
        let mut samples = Vec::with_capacity(fields.len() - 9);
        for (s, column) in fields[9..].iter().enumerate() {
            let values: Vec<String> = column.split(':').map(str::to_string).collect();
            if values.len() != format.len() {
                return Err(VcfError::FormatArity {
                    path:          path.to_path_buf(),
                    line:          line_no,
                    sample:        sample_names.get(s).cloned().unwrap_or_else(|| s.to_string()),
                    format_fields: format.len(),
                    values:        values.len(),
                });
            }
            samples.push(values);
        }
        (format, samples)
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(VariantRecord {
        chrom: fields[0].to_string(),
        pos,
        id: (fields[2] != ".").then(|| fields[2].to_string()),
        ref_allele: fields[3].to_string(),
        alt_alleles,
        qual,
        filter: FilterStatus::parse(fields[6]),
        info,
        format,
        samples,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::zygosity::{Zygosity, ZygosityLabelEncoder};
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const META: &str = "##fileformat=VCFv4.2
##FILTER=<ID=PASS,Description=\"All filters passed\">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype Quality\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
";

    /// Sixteen records, the first nine heterozygous, the rest haploid.
    pub(crate) fn unfiltered_vcf() -> String {
        let rows = [
            "1\t139098\t.\tCT\tT\t50\t.\tDP=15;AF=0.0666667\tGT:GQ\t0/1:50",
            "1\t139295\t.\tG\tAC\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t0/1:50",
            "1\t139738\t.\tG\tC,A\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t0/1:50",
            "1\t139861\t.\tT\tA\t50\t.\tDP=15;AF=0.0666667\tGT:GQ\t0/1:50",
            "1\t139976\t.\tG\tA\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t0/1:50",
            "1\t139988\t.\tT\tA\t50\t.\tDP=34;AF=0.0194118\tGT:GQ\t0/1:50",
            "1\t139994\t.\tG\tC\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t0/1:50",
            "1\t140009\t.\tC\tA\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t0/1:50",
            "1\t140013\t.\tC\tA\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t0/1:50",
            "1\t140016\t.\tT\tC\t50\t.\tDP=34;AF=0.0194118\tGT:GQ\t1:50",
            "1\t240021\t.\tT\tC\t50\t.\tDP=34;AF=0.0294118\tGT:GQ\t1:50",
            "1\t240023\t.\tA\tG\t50\t.\tDP=35;AF=0.0285714\tGT:GQ\t1:50",
            "1\t240046\t.\tC\tA\t50\t.\tDP=34;AF=0.0294118\tGT:GQ\t1:50",
            "1\t240090\t.\tT\tA\t50\t.\tDP=22;AF=0.0454545\tGT:GQ\t1:50",
            "1\t240147\t.\tC\tT\t50\t.\tDP=13;AF=0.692308\tGT:GQ\t1:50",
            "1\t240154\t.\tT\tC\t50\t.\tDP=13;AF=0.0769231\tGT:GQ\t1:50",
        ];
        format!(
            "{META}#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tCALLED\n{}\n",
            rows.join("\n")
        )
    }

    /// FORMAT declares only GT but the sample column carries GT:GQ.
    fn mismatched_vcf() -> String {
        format!(
            "{META}#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tCALLED\n\
             1\t240147\t.\tC\tT\t50\t.\tDP=13;AF=0.692308\tGT\t1:50\n\
             1\t240154\t.\tT\tC\t50\t.\tDP=13;AF=0.0769231\tGT\t0/1:50\n"
        )
    }

    pub(crate) fn small_filtered_vcf() -> String {
        format!(
            "{META}#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tCALLED\n\
             1\t139861\t.\tT\tA\t50\t.\tDP=15;AF=0.0666667\tGT:GQ\t0/1:50\n\
             1\t139976\t.\tG\tA\t50\t.\tDP=35;AF=0.0185714\tGT:GQ\t1/1:50\n\
             1\t240147\t.\tC\tT\t50\t.\tDP=13;AF=0.692308\tGT:GQ\t0/1:50\n"
        )
    }

    pub(crate) fn write_vcf(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn data_lines(content: &str) -> usize {
        content.lines().filter(|l| !l.is_empty() && !l.starts_with('#')).count()
    }

    #[test]
    fn test_record_count_matches_data_lines() {
        for content in [unfiltered_vcf(), small_filtered_vcf()] {
            let f   = write_vcf(&content);
            let set = VcfReader::new(f.path(), vec![], false).load().unwrap();
            assert_eq!(set.len(), data_lines(&content));
        }
    }

    #[test]
    fn test_parses_fields() {
        let f   = write_vcf(&unfiltered_vcf());
        let set = VcfReader::new(f.path(), vec![], false).load().unwrap();

        assert_eq!(set.sample_names, vec!["CALLED".to_string()]);
        assert_eq!(set.meta_lines.len(), 6);

        let r = set.get(2).unwrap();
        assert_eq!(r.chrom, "1");
        assert_eq!(r.pos, 139738);
        assert_eq!(r.pos0(), 139737);
        assert_eq!(r.id, None);
        assert_eq!(r.ref_allele, "G");
        assert_eq!(r.alt_alleles, vec!["C".to_string(), "A".to_string()]);
        assert_eq!(r.qual, Some(50.0));
        assert_eq!(r.filter, FilterStatus::Missing);
        assert_eq!(r.info.get("DP"), Some(&Some("35".to_string())));
        assert_eq!(r.info.get_index(1).map(|(k, _)| k.as_str()), Some("AF"));
        assert_eq!(r.sample_value(0, "GQ"), Some("50"));
        assert!(r.is_snv());
        assert!(!set.get(0).unwrap().is_snv());
    }

    #[test]
    fn test_mismatched_format_arity_fails_whole_load() {
        let f   = write_vcf(&mismatched_vcf());
        let err = VcfReader::new(f.path(), vec![], false).load().unwrap_err();
        match err {
            VcfError::FormatArity { line, format_fields, values, ref sample, .. } => {
                assert_eq!(line, 8);
                assert_eq!(format_fields, 1);
                assert_eq!(values, 2);
                assert_eq!(sample, "CALLED");
            }
            other => panic!("expected FormatArity, got {other:?}"),
        }
    }

    #[test]
    fn test_labels_from_fixture() {
        let f   = write_vcf(&small_filtered_vcf());
        let set = VcfReader::new(f.path(), vec![], false).load().unwrap();
        let labels: Vec<Zygosity> = set
            .iter()
            .map(|r| ZygosityLabelEncoder::label(r, set.is_fp))
            .collect();
        assert_eq!(
            labels,
            vec![Zygosity::Heterozygous, Zygosity::Homozygous, Zygosity::Heterozygous]
        );

        let f   = write_vcf(&unfiltered_vcf());
        let set = VcfReader::new(f.path(), vec![], false).load().unwrap();
        let haploid = set.get(9).unwrap();
        assert_eq!(ZygosityLabelEncoder::label(haploid, false), Zygosity::NoVariant);
    }

    #[test]
    fn test_false_positive_set_is_no_variant() {
        let f   = write_vcf(&small_filtered_vcf());
        let set = VcfReader::new(f.path(), vec![], true).load().unwrap();
        assert!(set.is_fp);
        assert!(set.iter().all(|r| ZygosityLabelEncoder::label(r, true) == Zygosity::NoVariant));
    }

    #[test]
    fn test_reads_gzipped_input() {
        let content = small_filtered_vcf();
        let mut f   = NamedTempFile::new().unwrap();
        {
            let mut gz = GzEncoder::new(&mut f, Compression::default());
            gz.write_all(content.as_bytes()).unwrap();
            gz.finish().unwrap();
        }
        let set = VcfReader::new(f.path(), vec![], false).load().unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_rejects_malformed_position() {
        let content = small_filtered_vcf().replace("139861", "abc");
        let f       = write_vcf(&content);
        let err     = VcfReader::new(f.path(), vec![], false).load().unwrap_err();
        assert!(matches!(err, VcfError::Parse { .. }));
    }

    #[test]
    fn test_rejects_more_bams_than_samples() {
        let f   = write_vcf(&small_filtered_vcf());
        let err = VcfReader::new(f.path(), vec!["a.bam".into(), "b.bam".into()], false)
            .load()
            .unwrap_err();
        assert!(matches!(err, VcfError::AlignmentCount { bams: 2, samples: 1, .. }));
    }

    #[test]
    fn test_header_after_data_is_an_error() {
        let header  = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n";
        let content = format!("{header}1\t100\t.\tA\tT\t50\t.\tDP=1\tGT\t0/1\n{header}");
        let f   = write_vcf(&content);
        let err = VcfReader::new(f.path(), vec![], false).load().unwrap_err();
        assert!(matches!(err, VcfError::Header { line: 3, .. }));

        let twice = format!("{header}{header}1\t100\t.\tA\tT\t50\t.\tDP=1\tGT\t0/1\n");
        let f   = write_vcf(&twice);
        let err = VcfReader::new(f.path(), vec![], false).load().unwrap_err();
        assert!(matches!(err, VcfError::Header { line: 2, .. }));
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let f   = write_vcf("1\t100\t.\tA\tT\t50\t.\tDP=1\n");
        let err = VcfReader::new(f.path(), vec![], false).load().unwrap_err();
        assert!(matches!(err, VcfError::Header { .. }));
    }
}
