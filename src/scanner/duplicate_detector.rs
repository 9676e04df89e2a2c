//! Duplicate detection by content digest

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::core::error::{display_name, FileError};
use crate::core::hasher::ContentHasher;
use crate::reporting::logger::RunLogger;

/// Files sharing one digest, in the order they were hashed
///
/// A group always holds at least one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestGroup {
    digest: String,
    paths: Vec<PathBuf>,
}

impl DigestGroup {
    pub fn new(digest: String, first: PathBuf) -> Self {
        Self {
            digest,
            paths: vec![first],
        }
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The file kept when duplicates are removed
    pub fn canonical(&self) -> &Path {
        &self.paths[0]
    }

    pub fn duplicates(&self) -> &[PathBuf] {
        &self.paths[1..]
    }

    pub fn has_duplicates(&self) -> bool {
        self.paths.len() > 1
    }
}

/// Outcome of hashing every candidate once
#[derive(Debug, Default)]
pub struct HashPass {
    /// Groups in first-seen order
    pub groups: Vec<DigestGroup>,
    /// Files that could not be hashed
    pub failures: Vec<FileError>,
}

impl HashPass {
    pub fn hashed_count(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }

    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DigestGroup> {
        self.groups.iter().filter(|g| g.has_duplicates())
    }
}

/// Hash every path and group them by digest
///
/// # Arguments
/// * `paths` - Candidate files, in scan order
/// * `hasher` - Digest source
/// * `log` - Run logger; each hash failure is logged as an error
///
/// # Returns
/// Digest groups plus the files that could not be hashed
pub fn group_by_digest(paths: &[PathBuf], hasher: &dyn ContentHasher, log: &RunLogger) -> HashPass {
    let mut pass = HashPass::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for path in paths {
        match hasher.digest(path) {
            Ok(digest) => {
                log.debug(format!("{} -> {}", display_name(path), digest));
                match index.get(&digest) {
                    Some(&slot) => pass.groups[slot].push(path.clone()),
                    None => {
                        index.insert(digest.clone(), pass.groups.len());
                        pass.groups.push(DigestGroup::new(digest, path.clone()));
                    }
                }
            }
            Err(err) => {
                log.error(&err);
                pass.failures.push(err);
            }
        }
    }

    pass
}

/// Split a digest group into groups of byte-identical files
///
/// Each resulting group starts with the first file that matched no earlier
/// group, so the input's canonical file heads the first one. A file whose
/// comparison with a group fails with an I/O error is logged as a warning
/// and never joins that group, so it is never deleted as its duplicate.
pub fn partition_by_content(group: &DigestGroup, log: &RunLogger) -> Vec<DigestGroup> {
    let mut partitions: Vec<DigestGroup> = Vec::new();

    for path in group.paths() {
        let mut matched = None;
        for (slot, partition) in partitions.iter().enumerate() {
            match files_identical(partition.canonical(), path) {
                Ok(true) => {
                    matched = Some(slot);
                    break;
                }
                Ok(false) => {}
                Err(e) => log.warn(format!(
                    "Could not compare {} with {}: {}",
                    display_name(path),
                    display_name(partition.canonical()),
                    e
                )),
            }
        }
        match matched {
            Some(slot) => partitions[slot].push(path.clone()),
            None => partitions.push(DigestGroup::new(group.digest.clone(), path.clone())),
        }
    }

    partitions
}

/// Byte-for-byte comparison of two files
pub fn files_identical(a: &Path, b: &Path) -> io::Result<bool> {
    let file_a = File::open(a)?;
    let file_b = File::open(b)?;
    if file_a.metadata()?.len() != file_b.metadata()?.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(file_a);
    let mut reader_b = BufReader::new(file_b);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let n = read_full(&mut reader_a, &mut buf_a)?;
        let m = read_full(&mut reader_b, &mut buf_b)?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Fill as much of `buf` as the reader allows, stopping only at EOF
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
