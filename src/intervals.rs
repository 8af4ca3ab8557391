use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::utils::get_reader;

pub const REQUIRED_COLUMNS: [&str; 3] = ["Chromosome", "Start", "End"];

/// one row of the loci table, other columns are ignored
#[derive(Debug, Clone, Deserialize)]
struct LocusRow {
    #[serde(rename = "Chromosome")]
    chromosome: String,
    #[serde(rename = "Start", deserialize_with = "coordinate")]
    start: u64,
    #[serde(rename = "End", deserialize_with = "coordinate")]
    end: u64,
}

/// Integer coordinate; integral floats such as `1000.0` are accepted.
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(de::Error::custom(format!(
            "coordinate must be a non-negative integer, got '{}'",
            raw
        ))),
    }
}

/// A BED interval in reference coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

/// Parse a tab-separated loci table with `Chromosome`, `Start` and `End`
/// columns, prefixing each chromosome with `chrom_prefix`.
pub fn read_loci<R: Read>(reader: R, chrom_prefix: &str) -> Result<Vec<Interval>> {
    let mut rdr = ReaderBuilder::new().delimiter(b'\t').from_reader(reader);
    let headers = rdr.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            bail!(
                "Required column not found in TSV file: '{}'. \
                 Please ensure the TSV has 'Chromosome', 'Start', and 'End' columns.",
                col
            );
        }
    }

    let mut intervals = vec![];
    for (i, result) in rdr.deserialize().enumerate() {
        let row: LocusRow = result.with_context(|| format!("malformed loci row {}", i + 1))?;
        intervals.push(Interval {
            chrom: format!("{}{}", chrom_prefix, row.chromosome),
            start: row.start,
            end: row.end,
        });
    }
    Ok(intervals)
}

/// Build the header-less BED file from the loci table at `loci_tsv`.
/// Returns the number of intervals written.
pub fn create_bed(loci_tsv: &Path, output_bed: &Path, chrom_prefix: &str) -> Result<usize> {
    if !loci_tsv.exists() {
        bail!("Imprinted loci TSV file not found: {}", loci_tsv.display());
    }
    let intervals = read_loci(get_reader(loci_tsv)?, chrom_prefix)
        .with_context(|| format!("failed to read {}", loci_tsv.display()))?;

    let out = File::create(output_bed)
        .with_context(|| format!("failed to create {}", output_bed.display()))?;
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(BufWriter::new(out));
    for interval in &intervals {
        wtr.serialize(interval)?;
    }
    wtr.flush()?;
    info!("Successfully created BED file: {}", output_bed.display());
    Ok(intervals.len())
}

#[test]
fn test_read_loci() {
    let tsv = "DMR\tChromosome\tStart\tEnd\tGene
PEG3\t19\t56837125\t56841903\tPEG3
H19\t11\t1999845\t2003508\tH19
";
    let intervals = read_loci(tsv.as_bytes(), "chr").unwrap();
    assert_eq!(
        intervals,
        vec![
            Interval { chrom: "chr19".to_string(), start: 56837125, end: 56841903 },
            Interval { chrom: "chr11".to_string(), start: 1999845, end: 2003508 },
        ]
    );
}

#[test]
fn test_read_loci_missing_column() {
    let tsv = "Chromosome\tStart\n1\t1000\n";
    let err = read_loci(tsv.as_bytes(), "chr").unwrap_err().to_string();
    assert!(err.contains("'End'"), "{}", err);
}

#[test]
fn test_read_loci_bad_coordinate() {
    for bad in ["abc", "1000.5", "-3"] {
        let tsv = format!("Chromosome\tStart\tEnd\n1\t{}\t2000\n", bad);
        let err = read_loci(tsv.as_bytes(), "chr").unwrap_err();
        assert!(format!("{:#}", err).contains("non-negative integer"), "{:#}", err);
    }
}

#[test]
fn test_read_loci_float_coordinates() {
    let tsv = "Chromosome\tStart\tEnd\n1\t1000.0\t2000.0\n";
    let intervals = read_loci(tsv.as_bytes(), "chr").unwrap();
    assert_eq!(
        intervals,
        vec![Interval { chrom: "chr1".to_string(), start: 1000, end: 2000 }]
    );
}

#[test]
fn test_create_bed() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = dir.path().join("loci.tsv");
    let bed = dir.path().join("hg38_imprinted_loci.bed");
    std::fs::write(&tsv, "Chromosome\tStart\tEnd\n1\t1000\t2000\nX\t5\t10\n").unwrap();

    assert_eq!(create_bed(&tsv, &bed, "chr").unwrap(), 2);
    assert_eq!(
        std::fs::read_to_string(&bed).unwrap(),
        "chr1\t1000\t2000\nchrX\t5\t10\n"
    );
}

#[test]
fn test_create_bed_missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let bed = dir.path().join("out.bed");
    let err = create_bed(&dir.path().join("missing.tsv"), &bed, "chr").unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(!bed.exists());
}
