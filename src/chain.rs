use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::LiftoverConfig;
use crate::runner::{Runner, ToolCommand};
use crate::utils::{get_reader, tmp_path};

/// Field count of a converter record carrying a single mapping.
pub const CHAIN_RECORD_FIELDS: usize = 13;

/// A line is kept when it is not a comment, not blank and has exactly
/// `CHAIN_RECORD_FIELDS` tab-separated fields.
pub fn is_chain_record(line: &str) -> bool {
    !line.starts_with('#')
        && !line.trim().is_empty()
        && line.split('\t').count() == CHAIN_RECORD_FIELDS
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub dropped: usize,
}

/// Copy the records accepted by [`is_chain_record`] from `reader` to `writer`.
pub fn filter_chain_records<R: BufRead, W: Write>(reader: R, writer: &mut W) -> Result<FilterStats> {
    let mut stats = FilterStats::default();
    for line in reader.lines() {
        let line = line?;
        if is_chain_record(&line) {
            writeln!(writer, "{}", line)?;
            stats.kept += 1;
        } else {
            stats.dropped += 1;
        }
    }
    Ok(stats)
}

pub fn converter_command(config: &LiftoverConfig, paf_file: &Path, tmp_chain: &Path) -> ToolCommand {
    ToolCommand::new(&config.converter)
        .arg("--no-chains")
        .arg("--best-only")
        .path_arg(paf_file)
        .path_arg(tmp_chain)
        .capture_output()
        .install_hint(
            "Make sure the cactus toolkit is installed and the script is accessible.",
        )
}

fn write_filtered(tmp_chain: &Path, chain_file: &Path) -> Result<FilterStats> {
    let reader = get_reader(tmp_chain)?;
    let out = File::create(chain_file)
        .with_context(|| format!("failed to create {}", chain_file.display()))?;
    let mut writer = BufWriter::new(out);
    let stats = filter_chain_records(reader, &mut writer)
        .with_context(|| format!("failed to filter {}", tmp_chain.display()))?;
    writer.flush()?;
    Ok(stats)
}

/// Convert a PAF file to a filtered chain file. The converter writes to
/// `<chain_file>.tmp`, which is removed once the filter pass succeeds.
/// An `Err` always leaves no file at `chain_file`; the `.tmp` output is kept
/// when the filter pass fails.
pub fn paf_to_chain<R: Runner>(
    runner: &R,
    config: &LiftoverConfig,
    paf_file: &Path,
    chain_file: &Path,
) -> Result<FilterStats> {
    let tmp_chain = tmp_path(chain_file);
    let cmd = converter_command(config, paf_file, &tmp_chain);
    info!("Running {} (best-only) for: {}", config.converter, paf_file.display());
    debug!("command: {}", cmd);
    if chain_file.exists() {
        fs::remove_file(chain_file)
            .with_context(|| format!("failed to remove stale {}", chain_file.display()))?;
    }
    runner.run(&cmd)?;

    let stats = match write_filtered(&tmp_chain, chain_file) {
        Ok(stats) => stats,
        Err(e) => {
            let _ = fs::remove_file(chain_file);
            return Err(e);
        }
    };

    fs::remove_file(&tmp_chain)
        .with_context(|| format!("failed to remove {}", tmp_chain.display()))?;
    info!(
        "Successfully generated filtered chain file: {} ({} records kept, {} dropped)",
        chain_file.display(),
        stats.kept,
        stats.dropped
    );
    Ok(stats)
}

#[cfg(test)]
fn record(n: usize) -> String {
    (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join("\t")
}

#[test]
fn test_is_chain_record() {
    assert!(is_chain_record(&record(13)));
    assert!(!is_chain_record(&record(12)));
    assert!(!is_chain_record(&record(14)));
    assert!(!is_chain_record(&format!("#{}", record(13))));
    assert!(!is_chain_record(""));
    assert!(!is_chain_record("  \t "));
    // a trailing carriage return does not add a field
    assert!(is_chain_record(&format!("{}\r", record(13))));
}

#[test]
fn test_filter_chain_records() {
    let input = format!(
        "# header\n{}\n\n{}\n{}\n#{}\n",
        record(13),
        record(12),
        record(13),
        record(13)
    );
    let mut out: Vec<u8> = vec![];
    let stats = filter_chain_records(input.as_bytes(), &mut out).unwrap();
    assert_eq!(stats, FilterStats { kept: 2, dropped: 4 });
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("{}\n{}\n", record(13), record(13))
    );
}

#[test]
fn test_filter_idempotent() {
    let input = format!("{}\n#x\n{}\n{}", record(13), record(5), record(13));
    let mut once: Vec<u8> = vec![];
    filter_chain_records(input.as_bytes(), &mut once).unwrap();
    let mut twice: Vec<u8> = vec![];
    let stats = filter_chain_records(once.as_slice(), &mut twice).unwrap();
    assert_eq!(once, twice);
    assert_eq!(stats.dropped, 0);
}

#[test]
fn test_converter_command() {
    let cmd = converter_command(
        &LiftoverConfig::default(),
        Path::new("HG002.paf"),
        Path::new("HG002_to_hg38.chain.tmp"),
    );
    assert_eq!(
        cmd.to_string(),
        "paf2liftover.py --no-chains --best-only HG002.paf HG002_to_hg38.chain.tmp"
    );
    assert!(cmd.capture);
}
