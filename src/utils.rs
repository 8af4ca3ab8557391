use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

// text reader, file as arg, decide based on extension
pub fn get_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(f)))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// List the regular files directly under `dir` whose name ends with one of
/// `suffixes`, in directory-listing order.
pub fn list_files_with_suffix(dir: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !suffixes.iter().any(|s| name.ends_with(s)) {
            continue;
        }
        // follows symlinks, directories are skipped
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// True when `path` exists and is larger than zero bytes.
pub fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// File name of `path` without its last extension, `asm.v2.fa` -> `asm.v2`.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<path>.tmp`, used for outputs that are filtered before landing.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

#[test]
fn test_list_files_with_suffix() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.fa", "b.fasta", "c.fna", "d.txt", "e.fa.fai"] {
        fs::write(dir.path().join(name), ">x\nACGT\n").unwrap();
    }
    fs::create_dir(dir.path().join("sub.fa")).unwrap();

    let mut names: Vec<String> = list_files_with_suffix(dir.path(), &[".fasta", ".fa", ".fna"])
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.fa", "b.fasta", "c.fna"]);
}

#[cfg(unix)]
#[test]
fn test_list_files_follows_symlinks() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let asm = dir.path().join("asm");
    fs::create_dir(&store).unwrap();
    fs::create_dir(&asm).unwrap();
    fs::write(store.join("HG002.fa"), ">x\nACGT\n").unwrap();
    fs::create_dir(store.join("sub.fa")).unwrap();
    symlink(store.join("HG002.fa"), asm.join("HG002.fa")).unwrap();
    symlink(store.join("sub.fa"), asm.join("sub.fa")).unwrap();
    symlink(store.join("gone.fa"), asm.join("dangling.fa")).unwrap();

    let files = list_files_with_suffix(&asm, &[".fa"]).unwrap();
    assert_eq!(files, vec![asm.join("HG002.fa")]);
}

#[test]
fn test_list_missing_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(list_files_with_suffix(&dir.path().join("nope"), &[".paf"]).is_err());
}

#[test]
fn test_is_non_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.bed");
    let full = dir.path().join("full.bed");
    fs::write(&empty, "").unwrap();
    fs::write(&full, "chr1\t1\t2\n").unwrap();
    assert!(!is_non_empty_file(&empty));
    assert!(is_non_empty_file(&full));
    assert!(!is_non_empty_file(&dir.path().join("missing.bed")));
}

#[test]
fn test_get_reader_gz() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loci.tsv.gz");
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    enc.write_all(b"Chromosome\tStart\tEnd\n").unwrap();
    enc.finish().unwrap();

    let mut s = String::new();
    get_reader(&path).unwrap().read_to_string(&mut s).unwrap();
    assert_eq!(s, "Chromosome\tStart\tEnd\n");
}

#[test]
fn test_names() {
    assert_eq!(file_stem(Path::new("/x/asm.v2.fa")), "asm.v2");
    assert_eq!(tmp_path(Path::new("/x/a.chain")), PathBuf::from("/x/a.chain.tmp"));
}

/// Per-item outcome counts of a directory loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}
