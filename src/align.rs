use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use crate::config::AlignConfig;
use crate::runner::{Runner, ToolCommand};
use crate::utils::{file_stem, list_files_with_suffix, BatchSummary};

pub const FASTA_SUFFIXES: [&str; 3] = [".fasta", ".fa", ".fna"];

/// `<output_dir>/<stem>_vs_<reference>.paf`
pub fn paf_output_path(config: &AlignConfig, query_fasta: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!(
        "{}_vs_{}.paf",
        file_stem(query_fasta),
        config.reference_name
    ))
}

pub fn aligner_command(
    config: &AlignConfig,
    target_fasta: &Path,
    query_fasta: &Path,
    output_paf: &Path,
) -> ToolCommand {
    ToolCommand::new(&config.aligner)
        .arg("-x")
        .arg(config.preset.as_str())
        .arg("--secondary=no")
        .arg("-K")
        .arg(config.index_size.as_str())
        .path_arg(target_fasta)
        .path_arg(query_fasta)
        .arg("-o")
        .path_arg(output_paf)
        .install_hint("Please ensure it is installed.")
}

/// Whole-genome alignment of one assembly against the reference.
pub fn align_assembly<R: Runner>(
    runner: &R,
    config: &AlignConfig,
    target_fasta: &Path,
    query_fasta: &Path,
    output_paf: &Path,
) -> Result<()> {
    let cmd = aligner_command(config, target_fasta, query_fasta, output_paf);
    info!("Running command: {}", cmd);
    runner.run(&cmd)?;
    info!("Successfully generated PAF file: {}", output_paf.display());
    Ok(())
}

/// Align every FASTA file of `input_dir`. A failed assembly is logged and
/// the loop moves on to the next one.
pub fn align_directory<R: Runner>(
    runner: &R,
    config: &AlignConfig,
    target_fasta: &Path,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<BatchSummary> {
    if !input_dir.is_dir() {
        bail!("Input directory '{}' does not exist.", input_dir.display());
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    info!("Processing FASTA files in: {}", input_dir.display());
    info!("Outputting PAF files to: {}", output_dir.display());

    let mut summary = BatchSummary::default();
    for query_fasta in list_files_with_suffix(input_dir, &FASTA_SUFFIXES)? {
        let output_paf = paf_output_path(config, &query_fasta, output_dir);
        info!("Aligning '{}'...", query_fasta.display());
        let res = align_assembly(runner, config, target_fasta, &query_fasta, &output_paf);
        if let Err(e) = &res {
            error!("Error running {}: {:#}", config.aligner, e);
        }
        summary.record(res.is_ok());
    }
    Ok(summary)
}

#[test]
fn test_aligner_command() {
    let config = AlignConfig::default();
    let cmd = aligner_command(
        &config,
        Path::new("hg38.fa"),
        Path::new("asm/HG002.fa"),
        Path::new("out/HG002_vs_hg38.paf"),
    );
    assert_eq!(
        cmd.to_string(),
        "minimap2 -x asm5 --secondary=no -K 4G hg38.fa asm/HG002.fa -o out/HG002_vs_hg38.paf"
    );
    assert!(!cmd.capture);
}

#[test]
fn test_paf_output_path() {
    let config = AlignConfig {
        reference_name: "chm13".to_string(),
        ..Default::default()
    };
    assert_eq!(
        paf_output_path(&config, Path::new("/in/HG002.mat.fasta"), Path::new("/out")),
        PathBuf::from("/out/HG002.mat_vs_chm13.paf")
    );
}
