use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use tracing::{error, info, warn, Level};

use imprintlift::config::LiftoverConfig;
use imprintlift::intervals::create_bed;
use imprintlift::liftover::liftover_directory;
use imprintlift::runner::SystemRunner;

static CLI: Lazy<Cli> = Lazy::new(Cli::parse);

/// Liftover imprinted loci coordinates to de novo assemblies using PAF
/// alignments, keeping only the best mapping per query.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// directory containing the PAF files
    #[arg(value_name = "PATH")]
    paf_dir: PathBuf,
    /// directory to save the chain and lifted-over BED files
    #[arg(value_name = "PATH")]
    output_bed_dir: PathBuf,
    /// directory to save the unmapped intervals BED files
    #[arg(value_name = "PATH")]
    unmapped_bed_dir: PathBuf,
    /// imprinted loci table (Chromosome, Start, End; tab-separated)
    #[arg(value_name = "FILE")]
    imprinted_loci_tsv: PathBuf,

    /// PAF to chain converter
    #[arg(long, default_value = "paf2liftover.py")]
    converter: String,
    /// liftover binary
    #[arg(long, default_value = "liftOver")]
    liftover: String,
    /// reference label used in file names
    #[arg(long, default_value = "hg38")]
    reference_name: String,
    /// prefix added to the loci chromosome names
    #[arg(long, default_value = "chr")]
    chrom_prefix: String,
    /// debug logging
    #[arg(long)]
    verbose: bool,
}

impl From<&Cli> for LiftoverConfig {
    fn from(cli: &Cli) -> Self {
        LiftoverConfig {
            converter: cli.converter.clone(),
            liftover: cli.liftover.clone(),
            reference_name: cli.reference_name.clone(),
            chrom_prefix: cli.chrom_prefix.clone(),
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = LiftoverConfig::from(cli);
    for dir in [&cli.output_bed_dir, &cli.unmapped_bed_dir] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let bed_file = env::current_dir()?.join(format!("{}_imprinted_loci.bed", config.reference_name));
    let n = create_bed(&cli.imprinted_loci_tsv, &bed_file, &config.chrom_prefix)?;
    info!("{} intervals to lift", n);

    match liftover_directory(
        &SystemRunner,
        &config,
        &cli.paf_dir,
        &cli.output_bed_dir,
        &cli.unmapped_bed_dir,
        &bed_file,
    ) {
        Ok(summary) => info!(
            "Lifted {} of {} assemblies ({} failed or skipped)",
            summary.succeeded, summary.attempted, summary.failed
        ),
        Err(e) => error!("Error: {:#}", e),
    }

    if bed_file.exists() {
        if let Err(e) = fs::remove_file(&bed_file) {
            warn!("failed to remove {}: {}", bed_file.display(), e);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let level = if CLI.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(&CLI) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
