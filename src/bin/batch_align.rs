use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use once_cell::sync::Lazy;
use tracing::{error, info, Level};

use imprintlift::align::align_directory;
use imprintlift::config::AlignConfig;
use imprintlift::runner::SystemRunner;

static CLI: Lazy<Cli> = Lazy::new(Cli::parse);

/// Run whole-genome alignment using minimap2 on FASTA files in a directory.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// target (reference) FASTA file
    #[arg(value_name = "FILE")]
    target_fasta: PathBuf,
    /// directory containing the de novo assembly FASTA files
    #[arg(value_name = "PATH")]
    input_dir: PathBuf,
    /// directory where the output PAF files will be saved
    #[arg(value_name = "PATH")]
    output_dir: PathBuf,

    /// aligner binary
    #[arg(long, default_value = "minimap2")]
    aligner: String,
    /// aligner preset
    #[arg(long, default_value = "asm5")]
    preset: String,
    /// bases loaded per mini-batch (minimap2 -K)
    #[arg(long, default_value = "4G")]
    index_size: String,
    /// reference label used in output file names
    #[arg(long, default_value = "hg38")]
    reference_name: String,
    /// debug logging
    #[arg(long)]
    verbose: bool,
}

impl From<&Cli> for AlignConfig {
    fn from(cli: &Cli) -> Self {
        AlignConfig {
            aligner: cli.aligner.clone(),
            preset: cli.preset.clone(),
            index_size: cli.index_size.clone(),
            reference_name: cli.reference_name.clone(),
        }
    }
}

fn main() -> ExitCode {
    let level = if CLI.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = AlignConfig::from(&*CLI);
    match align_directory(
        &SystemRunner,
        &config,
        &CLI.target_fasta,
        &CLI.input_dir,
        &CLI.output_dir,
    ) {
        Ok(summary) => {
            info!(
                "Aligned {} of {} assemblies ({} failed)",
                summary.succeeded, summary.attempted, summary.failed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
