use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::chain::paf_to_chain;
use crate::config::LiftoverConfig;
use crate::runner::{Runner, ToolCommand};
use crate::utils::{is_non_empty_file, list_files_with_suffix, BatchSummary};

pub const PAF_SUFFIX: &str = ".paf";

/// What `liftOver` left behind for one assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftoverOutcome {
    pub has_unmapped: bool,
}

/// Output locations derived from one PAF file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPaths {
    pub assembly: String,
    pub paf: PathBuf,
    pub chain: PathBuf,
    pub lifted_bed: PathBuf,
    pub unmapped_bed: PathBuf,
}

impl AssemblyPaths {
    pub fn new(
        config: &LiftoverConfig,
        paf: &Path,
        output_bed_dir: &Path,
        unmapped_bed_dir: &Path,
    ) -> Self {
        let name = paf
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let assembly = name.strip_suffix(PAF_SUFFIX).unwrap_or(&name).to_string();
        AssemblyPaths {
            chain: output_bed_dir.join(format!("{}_to_{}.chain", assembly, config.reference_name)),
            lifted_bed: output_bed_dir.join(format!("{}_imprinted_loci.bed", assembly)),
            unmapped_bed: unmapped_bed_dir.join(format!("{}_unmapped.bed", assembly)),
            paf: paf.to_path_buf(),
            assembly,
        }
    }
}

pub fn liftover_command(
    config: &LiftoverConfig,
    bed_file: &Path,
    chain_file: &Path,
    output_bed: &Path,
    unmapped_bed: &Path,
) -> ToolCommand {
    ToolCommand::new(&config.liftover)
        .path_arg(bed_file)
        .path_arg(chain_file)
        .path_arg(output_bed)
        .path_arg(unmapped_bed)
        .install_hint(
            "Make sure the UCSC Genome Browser utilities are installed and liftOver is accessible.",
        )
}

/// Lift `bed_file` through `chain_file`.
pub fn run_liftover<R: Runner>(
    runner: &R,
    config: &LiftoverConfig,
    bed_file: &Path,
    chain_file: &Path,
    output_bed: &Path,
    unmapped_bed: &Path,
) -> Result<LiftoverOutcome> {
    let cmd = liftover_command(config, bed_file, chain_file, output_bed, unmapped_bed);
    info!("Running {} for chain file: {}", config.liftover, chain_file.display());
    runner.run(&cmd)?;
    info!("Successfully generated lifted-over BED file: {}", output_bed.display());

    let has_unmapped = is_non_empty_file(unmapped_bed);
    if has_unmapped {
        info!("Unmapped intervals saved to: {}", unmapped_bed.display());
    } else {
        info!("No intervals were unmapped.");
    }
    Ok(LiftoverOutcome { has_unmapped })
}

/// Convert and lift one assembly. `Ok(None)` when no chain file came out of
/// the conversion and the liftover was skipped.
pub fn process_paf<R: Runner>(
    runner: &R,
    config: &LiftoverConfig,
    paths: &AssemblyPaths,
    bed_file: &Path,
) -> Result<Option<LiftoverOutcome>> {
    if let Err(e) = paf_to_chain(runner, config, &paths.paf, &paths.chain) {
        error!("Chain conversion failed for {}: {:#}", paths.assembly, e);
    }

    if !paths.chain.exists() {
        warn!(
            "Chain file not generated for {}. Skipping {}.",
            paths.assembly, config.liftover
        );
        return Ok(None);
    }
    run_liftover(
        runner,
        config,
        bed_file,
        &paths.chain,
        &paths.lifted_bed,
        &paths.unmapped_bed,
    )
    .map(Some)
}

/// Lift `bed_file` onto every assembly with a PAF file in `paf_dir`, one
/// assembly at a time. Failures are logged and do not stop the loop.
pub fn liftover_directory<R: Runner>(
    runner: &R,
    config: &LiftoverConfig,
    paf_dir: &Path,
    output_bed_dir: &Path,
    unmapped_bed_dir: &Path,
    bed_file: &Path,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    for paf in list_files_with_suffix(paf_dir, &[PAF_SUFFIX])? {
        let paths = AssemblyPaths::new(config, &paf, output_bed_dir, unmapped_bed_dir);
        let ok = match process_paf(runner, config, &paths, bed_file) {
            Ok(outcome) => outcome.is_some(),
            Err(e) => {
                error!("Error running {}: {:#}", config.liftover, e);
                false
            }
        };
        summary.record(ok);
    }
    Ok(summary)
}

#[test]
fn test_assembly_paths() {
    let paths = AssemblyPaths::new(
        &LiftoverConfig::default(),
        Path::new("/paf/HG002_vs_hg38.paf"),
        Path::new("/bed"),
        Path::new("/unmapped"),
    );
    assert_eq!(paths.assembly, "HG002_vs_hg38");
    assert_eq!(paths.chain, PathBuf::from("/bed/HG002_vs_hg38_to_hg38.chain"));
    assert_eq!(paths.lifted_bed, PathBuf::from("/bed/HG002_vs_hg38_imprinted_loci.bed"));
    assert_eq!(paths.unmapped_bed, PathBuf::from("/unmapped/HG002_vs_hg38_unmapped.bed"));
}

#[test]
fn test_liftover_command() {
    let cmd = liftover_command(
        &LiftoverConfig::default(),
        Path::new("hg38.bed"),
        Path::new("a.chain"),
        Path::new("a.bed"),
        Path::new("a_unmapped.bed"),
    );
    assert_eq!(cmd.to_string(), "liftOver hg38.bed a.chain a.bed a_unmapped.bed");
    assert!(!cmd.capture);
}
