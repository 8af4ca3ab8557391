use std::cell::RefCell;
use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use imprintlift::align::align_directory;
use imprintlift::chain::paf_to_chain;
use imprintlift::config::{AlignConfig, LiftoverConfig};
use imprintlift::intervals::create_bed;
use imprintlift::liftover::{liftover_directory, process_paf, run_liftover, AssemblyPaths};
use imprintlift::runner::{Runner, ToolCommand, ToolOutput};

/// Records every command and fakes the external tools' side effects.
#[derive(Default)]
struct FakeRunner {
    calls: RefCell<Vec<ToolCommand>>,
    /// commands mentioning this string fail as if the binary were missing
    fail_on: Option<String>,
    converter_output: Vec<u8>,
    unmapped_output: String,
}

impl Runner for FakeRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(command.clone());
        if let Some(pat) = &self.fail_on {
            if command.to_string().contains(pat.as_str()) {
                bail!("{} not found in your PATH", command.program);
            }
        }
        let args: Vec<&Path> = command.args.iter().map(Path::new).collect();
        match command.program.as_str() {
            // paf2liftover.py --no-chains --best-only <paf> <tmp>
            "paf2liftover.py" => fs::write(args[3], &self.converter_output)?,
            // liftOver <bed> <chain> <mapped> <unmapped>
            "liftOver" => {
                fs::copy(args[0], args[2])?;
                fs::write(args[3], &self.unmapped_output)?;
            }
            _ => {}
        }
        Ok(ToolOutput::default())
    }
}

impl FakeRunner {
    fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }
}

fn chain_line(n: usize) -> String {
    (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join("\t")
}

#[test]
fn align_directory_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("asm");
    let output = dir.path().join("paf/nested");
    fs::create_dir(&input).unwrap();
    for name in ["HG002.fa", "HG005.fasta", "notes.txt"] {
        fs::write(input.join(name), ">c\nACGT\n").unwrap();
    }

    let runner = FakeRunner {
        fail_on: Some("HG002".to_string()),
        ..Default::default()
    };
    let summary = align_directory(
        &runner,
        &AlignConfig::default(),
        Path::new("hg38.fa"),
        &input,
        &output,
    )
    .unwrap();

    assert!(output.is_dir());
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    let calls = runner.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.program == "minimap2"));
    let rendered: Vec<String> = calls.iter().map(|c| c.to_string()).collect();
    assert!(rendered.iter().any(|c| c.ends_with("HG005_vs_hg38.paf")));
    assert!(!rendered.iter().any(|c| c.contains("notes")));
}

#[test]
fn align_directory_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::default();
    let res = align_directory(
        &runner,
        &AlignConfig::default(),
        Path::new("hg38.fa"),
        &dir.path().join("missing"),
        &dir.path().join("out"),
    );
    assert!(res.is_err());
    assert!(runner.calls.borrow().is_empty());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn process_paf_filters_chain_and_lifts() {
    let dir = tempfile::tempdir().unwrap();
    let paf = dir.path().join("HG002.paf");
    fs::write(&paf, "").unwrap();
    let bed = dir.path().join("hg38.bed");
    fs::write(&bed, "chr1\t1000\t2000\n").unwrap();

    let runner = FakeRunner {
        converter_output: format!(
            "#comment\n{}\n\n{}\n",
            chain_line(13),
            chain_line(12)
        )
        .into_bytes(),
        ..Default::default()
    };
    let config = LiftoverConfig::default();
    let paths = AssemblyPaths::new(&config, &paf, dir.path(), dir.path());
    let outcome = process_paf(&runner, &config, &paths, &bed).unwrap();

    assert_eq!(outcome.map(|o| o.has_unmapped), Some(false));
    assert_eq!(runner.programs(), vec!["paf2liftover.py", "liftOver"]);
    assert_eq!(
        fs::read_to_string(&paths.chain).unwrap(),
        format!("{}\n", chain_line(13))
    );
    assert!(!dir.path().join("HG002_to_hg38.chain.tmp").exists());
    assert_eq!(
        fs::read_to_string(&paths.lifted_bed).unwrap(),
        "chr1\t1000\t2000\n"
    );
}

#[test]
fn process_paf_skips_liftover_without_chain() {
    let dir = tempfile::tempdir().unwrap();
    let paf = dir.path().join("HG002.paf");
    fs::write(&paf, "").unwrap();

    let runner = FakeRunner {
        fail_on: Some("paf2liftover.py".to_string()),
        ..Default::default()
    };
    let config = LiftoverConfig::default();
    let paths = AssemblyPaths::new(&config, &paf, dir.path(), dir.path());
    let outcome = process_paf(&runner, &config, &paths, &dir.path().join("x.bed")).unwrap();

    assert!(outcome.is_none());
    assert!(!paths.chain.exists());
    assert_eq!(runner.programs(), vec!["paf2liftover.py"]);
}

#[test]
fn run_liftover_reports_unmapped() {
    let dir = tempfile::tempdir().unwrap();
    let bed = dir.path().join("in.bed");
    fs::write(&bed, "chr1\t1\t2\n").unwrap();
    let config = LiftoverConfig::default();

    let runner = FakeRunner {
        unmapped_output: "#Deleted in new\nchr1\t1\t2\n".to_string(),
        ..Default::default()
    };
    let out = run_liftover(
        &runner,
        &config,
        &bed,
        Path::new("a.chain"),
        &dir.path().join("a.bed"),
        &dir.path().join("a_unmapped.bed"),
    )
    .unwrap();
    assert!(out.has_unmapped);

    let runner = FakeRunner::default();
    let out = run_liftover(
        &runner,
        &config,
        &bed,
        Path::new("b.chain"),
        &dir.path().join("b.bed"),
        &dir.path().join("b_unmapped.bed"),
    )
    .unwrap();
    assert!(!out.has_unmapped);
}

#[test]
fn liftover_directory_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paf_dir = dir.path().join("paf");
    let bed_dir = dir.path().join("bed");
    let unmapped_dir = dir.path().join("unmapped");
    for d in [&paf_dir, &bed_dir, &unmapped_dir] {
        fs::create_dir(d).unwrap();
    }
    for name in ["A.paf", "B.paf", "C.paf.bak"] {
        fs::write(paf_dir.join(name), "").unwrap();
    }
    let tsv = dir.path().join("loci.tsv");
    fs::write(&tsv, "Chromosome\tStart\tEnd\n1\t1000\t2000\n").unwrap();
    let bed = dir.path().join("hg38_imprinted_loci.bed");
    create_bed(&tsv, &bed, "chr").unwrap();

    let runner = FakeRunner {
        fail_on: Some("A.paf".to_string()),
        converter_output: format!("{}\n", chain_line(13)).into_bytes(),
        ..Default::default()
    };
    let summary = liftover_directory(
        &runner,
        &LiftoverConfig::default(),
        &paf_dir,
        &bed_dir,
        &unmapped_dir,
        &bed,
    )
    .unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let programs = runner.programs();
    assert_eq!(programs.iter().filter(|p| *p == "paf2liftover.py").count(), 2);
    assert_eq!(programs.iter().filter(|p| *p == "liftOver").count(), 1);
    assert!(!bed_dir.join("A_to_hg38.chain").exists());
    assert_eq!(
        fs::read_to_string(bed_dir.join("B_imprinted_loci.bed")).unwrap(),
        "chr1\t1000\t2000\n"
    );
    assert!(unmapped_dir.join("B_unmapped.bed").exists());
}

#[test]
fn process_paf_unreadable_chain_leaves_no_chain_file() {
    let dir = tempfile::tempdir().unwrap();
    let paf = dir.path().join("HG002.paf");
    fs::write(&paf, "").unwrap();

    let mut converter_output = format!("{}\n", chain_line(13)).into_bytes();
    converter_output.extend_from_slice(b"\xff\xfe bad\n");
    let runner = FakeRunner {
        converter_output,
        ..Default::default()
    };
    let config = LiftoverConfig::default();
    let paths = AssemblyPaths::new(&config, &paf, dir.path(), dir.path());

    assert!(paf_to_chain(&runner, &config, &paths.paf, &paths.chain).is_err());
    assert!(!paths.chain.exists());
    // converter output stays behind for inspection
    assert!(dir.path().join("HG002_to_hg38.chain.tmp").exists());

    let runner = FakeRunner {
        converter_output: runner.converter_output.clone(),
        ..Default::default()
    };
    let outcome = process_paf(&runner, &config, &paths, &dir.path().join("x.bed")).unwrap();
    assert!(outcome.is_none());
    assert!(!paths.chain.exists());
    assert_eq!(runner.programs(), vec!["paf2liftover.py"]);
}

#[test]
fn paf_to_chain_failure_removes_stale_chain() {
    let dir = tempfile::tempdir().unwrap();
    let paf = dir.path().join("HG002.paf");
    fs::write(&paf, "").unwrap();
    let config = LiftoverConfig::default();
    let paths = AssemblyPaths::new(&config, &paf, dir.path(), dir.path());
    fs::write(&paths.chain, format!("{}\n", chain_line(13))).unwrap();

    let runner = FakeRunner {
        fail_on: Some("paf2liftover.py".to_string()),
        ..Default::default()
    };
    assert!(paf_to_chain(&runner, &config, &paths.paf, &paths.chain).is_err());
    assert!(!paths.chain.exists());
}

#[test]
fn liftover_directory_continues_after_liftover_failure() {
    let dir = tempfile::tempdir().unwrap();
    let paf_dir = dir.path().join("paf");
    let bed_dir = dir.path().join("bed");
    let unmapped_dir = dir.path().join("unmapped");
    for d in [&paf_dir, &bed_dir, &unmapped_dir] {
        fs::create_dir(d).unwrap();
    }
    for name in ["A.paf", "B.paf"] {
        fs::write(paf_dir.join(name), "").unwrap();
    }
    let bed = dir.path().join("hg38_imprinted_loci.bed");
    fs::write(&bed, "chr1\t1000\t2000\n").unwrap();

    // only the liftOver command for A names its mapped output
    let runner = FakeRunner {
        fail_on: Some("A_imprinted_loci.bed".to_string()),
        converter_output: format!("{}\n", chain_line(13)).into_bytes(),
        ..Default::default()
    };
    let summary = liftover_directory(
        &runner,
        &LiftoverConfig::default(),
        &paf_dir,
        &bed_dir,
        &unmapped_dir,
        &bed,
    )
    .unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let programs = runner.programs();
    assert_eq!(programs.iter().filter(|p| *p == "liftOver").count(), 2);
    assert!(bed_dir.join("A_to_hg38.chain").exists());
    assert!(!bed_dir.join("A_imprinted_loci.bed").exists());
    assert_eq!(
        fs::read_to_string(bed_dir.join("B_imprinted_loci.bed")).unwrap(),
        "chr1\t1000\t2000\n"
    );
}

#[cfg(unix)]
#[test]
fn align_directory_follows_symlinked_assemblies() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let input = dir.path().join("asm");
    fs::create_dir(&store).unwrap();
    fs::create_dir(&input).unwrap();
    fs::write(store.join("HG002.fa"), ">c\nACGT\n").unwrap();
    symlink(store.join("HG002.fa"), input.join("HG002.fa")).unwrap();

    let runner = FakeRunner::default();
    let summary = align_directory(
        &runner,
        &AlignConfig::default(),
        Path::new("hg38.fa"),
        &input,
        &dir.path().join("out"),
    )
    .unwrap();
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);
}
