//! Two-pass deduplicate and rename
//!
//! The directory is scanned and every candidate hashed before anything is
//! deleted or renamed. Every duplicate is then deleted before the first
//! rename, so no survivor is pushed onto a suffixed name by a file that is
//! about to go away. Per-file failures are logged and counted, never
//! propagated.

use anyhow::{bail, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{display_name, FileError};
use super::hasher::ContentHasher;
use crate::reporting::logger::RunLogger;
use crate::reporting::report_writer::{Action, RunReport};
use crate::scanner::duplicate_detector::{group_by_digest, partition_by_content, DigestGroup};
use crate::scanner::file_scanner::collect_image_files;

/// Digest characters used in new file names
pub const DEFAULT_PREFIX_LEN: usize = 8;

/// Naming and verification options
///
/// The digest algorithm and read buffer belong to the `ContentHasher`
/// handed to `rename_and_deduplicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameOptions {
    pub prefix_len: usize,
    /// Compare file bytes before deleting a duplicate
    pub verify: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            verify: false,
        }
    }
}

/// A kept file waiting for its digest name
struct Survivor<'a> {
    original: PathBuf,
    current: PathBuf,
    digest: &'a str,
    prefix: &'a str,
}

impl Survivor<'_> {
    fn plain_target(&self, dir: &Path) -> PathBuf {
        dir.join(target_name(self.prefix, None, self.original.extension()))
    }
}

/// Rename every image in `dir` to its digest and delete exact duplicates
///
/// # Arguments
/// * `dir` - Directory to process (not recursed into)
/// * `options` - Naming and verification options
/// * `hasher` - Digest source for the hash pass
/// * `log` - Run logger
///
/// # Returns
/// The run report, or an error if `dir` is not a readable directory
pub fn rename_and_deduplicate(
    dir: &Path,
    options: &RenameOptions,
    hasher: &dyn ContentHasher,
    log: &RunLogger,
) -> Result<RunReport> {
    if !dir.is_dir() {
        bail!("Directory '{}' does not exist", dir.display());
    }

    let mut report = RunReport::new(dir);

    let candidates = collect_image_files(dir)?;
    report.summary.scanned = candidates.len();
    log.info(format!("Found {} image file(s)", candidates.len()));

    let pass = group_by_digest(&candidates, hasher, log);
    for err in &pass.failures {
        report.summary.record_error(err.stage());
        report.actions.push(Action::from(err));
    }
    log.info(format!(
        "Hashed {} file(s), {} with duplicates",
        pass.hashed_count(),
        pass.duplicate_groups().count()
    ));

    let mut survivors = Vec::with_capacity(pass.groups.len());
    for group in &pass.groups {
        let prefix = digest_prefix(group.digest(), options.prefix_len);

        let partitions = if options.verify && group.has_duplicates() {
            partition_by_content(group, log)
        } else {
            vec![group.clone()]
        };

        for partition in &partitions {
            remove_duplicates(partition, &mut report, log);
            survivors.push(Survivor {
                original: partition.canonical().to_path_buf(),
                current: partition.canonical().to_path_buf(),
                digest: group.digest(),
                prefix,
            });
        }
    }

    settle_names(dir, survivors, &mut report, log);

    Ok(report)
}

fn remove_duplicates(group: &DigestGroup, report: &mut RunReport, log: &RunLogger) {
    for duplicate in group.duplicates() {
        match remove_duplicate(duplicate) {
            Ok(()) => {
                log.info(format!(
                    "Removed duplicate: {} (hash: {})",
                    display_name(duplicate),
                    group.digest()
                ));
                report.summary.duplicates_removed += 1;
                report.actions.push(Action::Removed {
                    path: duplicate.clone(),
                    digest: group.digest().to_string(),
                });
            }
            Err(err) => record_failure(report, log, err),
        }
    }
}

/// Move every survivor to its digest name
///
/// Survivors whose plain `<prefix>.<ext>` name is free (or already theirs)
/// go first, repeatedly, since each move can free a name another survivor
/// wants. When nothing else can move, one blocked survivor is parked on the
/// first free suffixed name; parked survivors take their plain name later
/// if it frees up. This leaves every survivor on the name a second run
/// would pick.
fn settle_names(dir: &Path, mut pending: Vec<Survivor<'_>>, report: &mut RunReport, log: &RunLogger) {
    let mut parked: Vec<Survivor<'_>> = Vec::new();

    loop {
        let mut progressed = false;

        let mut blocked = Vec::new();
        for mut survivor in pending.drain(..) {
            let plain = survivor.plain_target(dir);
            if plain == survivor.current {
                progressed = true;
                finish(survivor, report, log);
            } else if !is_occupied(&plain) {
                progressed = true;
                match move_file(&survivor.current, &plain) {
                    Ok(()) => {
                        survivor.current = plain;
                        finish(survivor, report, log);
                    }
                    Err(err) => record_failure(report, log, err),
                }
            } else {
                blocked.push(survivor);
            }
        }
        pending = blocked;

        let mut waiting = Vec::new();
        for mut survivor in parked.drain(..) {
            let plain = survivor.plain_target(dir);
            if is_occupied(&plain) {
                waiting.push(survivor);
                continue;
            }
            progressed = true;
            match move_file(&survivor.current, &plain) {
                Ok(()) => survivor.current = plain,
                Err(err) => log.warn(format!("Keeping suffixed name: {}", err)),
            }
            finish(survivor, report, log);
        }
        parked = waiting;

        if progressed {
            continue;
        }
        if pending.is_empty() {
            break;
        }

        let mut survivor = pending.remove(0);
        let target = resolve_target(dir, &survivor.current, survivor.prefix);
        if target == survivor.current {
            parked.push(survivor);
            continue;
        }
        match move_file(&survivor.current, &target) {
            Ok(()) => {
                survivor.current = target;
                parked.push(survivor);
            }
            Err(err) => record_failure(report, log, err),
        }
    }

    for survivor in parked {
        finish(survivor, report, log);
    }
}

/// Record where a survivor ended up
fn finish(survivor: Survivor<'_>, report: &mut RunReport, log: &RunLogger) {
    if survivor.current == survivor.original {
        log.debug(format!("Already named: {}", display_name(&survivor.current)));
        return;
    }

    log.info(format!(
        "Renamed: {} -> {}",
        display_name(&survivor.original),
        display_name(&survivor.current)
    ));
    report.summary.renamed += 1;
    report.actions.push(Action::Renamed {
        from: survivor.original,
        to: survivor.current,
        digest: survivor.digest.to_string(),
    });
}

fn record_failure(report: &mut RunReport, log: &RunLogger, err: FileError) {
    log.error(&err);
    report.summary.record_error(err.stage());
    report.actions.push(Action::from(&err));
}

fn remove_duplicate(path: &Path) -> Result<(), FileError> {
    fs::remove_file(path).map_err(|source| FileError::Delete {
        path: path.to_path_buf(),
        source,
    })
}

fn move_file(from: &Path, to: &Path) -> Result<(), FileError> {
    fs::rename(from, to).map_err(|source| FileError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// First free `<prefix>[_<n>].<ext>` in `dir`
///
/// A name is free when nothing exists there or when the existing entry is
/// `source` itself.
pub fn resolve_target(dir: &Path, source: &Path, prefix: &str) -> PathBuf {
    let extension = source.extension();
    let mut target = dir.join(target_name(prefix, None, extension));
    let mut counter = 1;

    while is_occupied(&target) && !is_same_file(source, &target) {
        target = dir.join(target_name(prefix, Some(counter), extension));
        counter += 1;
    }

    target
}

/// `<prefix>[_<counter>][.<ext>]`, extension case preserved
pub fn target_name(prefix: &str, counter: Option<usize>, extension: Option<&std::ffi::OsStr>) -> OsString {
    let mut name = OsString::from(prefix);
    if let Some(counter) = counter {
        name.push(format!("_{}", counter));
    }
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Leading `len` characters of a hex digest
pub fn digest_prefix(digest: &str, len: usize) -> &str {
    match digest.char_indices().nth(len) {
        Some((idx, _)) => &digest[..idx],
        None => digest,
    }
}

fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Whether two paths name the same filesystem entry (symlinks not followed)
#[cfg(unix)]
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(meta_a), Ok(meta_b)) => meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino(),
        _ => false,
    }
}

/// Whether two paths name the same filesystem entry
#[cfg(not(unix))]
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(path_a), Ok(path_b)) => path_a == path_b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::StreamHasher;
    use std::ffi::OsStr;
    use std::fs::File;
    use tempfile::TempDir;

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_digest_prefix() {
        assert_eq!(digest_prefix("900150983cd24fb0d6963f7d28e17f72", 8), "90015098");
        assert_eq!(digest_prefix("abc", 8), "abc");
        assert_eq!(digest_prefix("abcdef", 0), "");
    }

    #[test]
    fn test_target_name() {
        assert_eq!(target_name("deadbeef", None, Some(OsStr::new("JPG"))), OsString::from("deadbeef.JPG"));
        assert_eq!(target_name("deadbeef", Some(2), Some(OsStr::new("png"))), OsString::from("deadbeef_2.png"));
        assert_eq!(target_name("deadbeef", None, None), OsString::from("deadbeef"));
    }

    #[test]
    fn test_resolve_target_free_name() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        File::create(&source).unwrap();

        assert_eq!(resolve_target(dir.path(), &source, "deadbeef"), dir.path().join("deadbeef.jpg"));
    }

    #[test]
    fn test_resolve_target_skips_occupied_names() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        File::create(&source).unwrap();
        File::create(dir.path().join("deadbeef.jpg")).unwrap();
        File::create(dir.path().join("deadbeef_1.jpg")).unwrap();

        assert_eq!(resolve_target(dir.path(), &source, "deadbeef"), dir.path().join("deadbeef_2.jpg"));
    }

    #[test]
    fn test_resolve_target_own_name() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("deadbeef_1.jpg");
        File::create(&source).unwrap();
        File::create(dir.path().join("deadbeef.jpg")).unwrap();

        assert_eq!(resolve_target(dir.path(), &source, "deadbeef"), source);
    }

    #[test]
    fn test_is_same_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();

        assert!(is_same_file(&a, &a));
        assert!(is_same_file(&a, &dir.path().join(".").join("a.jpg")));
        assert!(!is_same_file(&a, &b));
        assert!(!is_same_file(&a, &dir.path().join("missing.jpg")));
    }

    #[test]
    fn test_identical_files_collapse_to_one() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.jpg"), b"abc").unwrap();
        fs::write(dir.path().join("b.jpg"), b"abc").unwrap();

        let report = rename_and_deduplicate(
            dir.path(),
            &RenameOptions::default(),
            &StreamHasher::default(),
            &RunLogger::disabled(),
        )
        .unwrap();

        assert_eq!(names_in(dir.path()), vec!["90015098.jpg"]);
        assert_eq!(report.summary.scanned, 2);
        assert_eq!(report.summary.renamed, 1);
        assert_eq!(report.summary.duplicates_removed, 1);
        assert_eq!(report.summary.errors(), 0);
        assert_eq!(report.summary.retained(), 1);
    }

    #[test]
    fn test_prefix_len_option() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"abc").unwrap();

        let options = RenameOptions {
            prefix_len: 12,
            ..RenameOptions::default()
        };
        rename_and_deduplicate(dir.path(), &options, &StreamHasher::default(), &RunLogger::disabled()).unwrap();

        assert_eq!(names_in(dir.path()), vec!["900150983cd2.png"]);
    }

    #[test]
    fn test_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"abc").unwrap();

        let result = rename_and_deduplicate(
            &file,
            &RenameOptions::default(),
            &StreamHasher::default(),
            &RunLogger::disabled(),
        );
        assert!(result.is_err());
        assert!(file.exists());
    }

    #[test]
    fn test_swapped_names_both_settle_on_plain_names() {
        let dir = TempDir::new().unwrap();
        // Each file sits on the other's digest name
        fs::write(dir.path().join("9e107d9d.jpg"), b"abc").unwrap();
        fs::write(dir.path().join("90015098.jpg"), b"The quick brown fox jumps over the lazy dog").unwrap();

        let report = rename_and_deduplicate(
            dir.path(),
            &RenameOptions::default(),
            &StreamHasher::default(),
            &RunLogger::disabled(),
        )
        .unwrap();

        assert_eq!(names_in(dir.path()), vec!["90015098.jpg", "9e107d9d.jpg"]);
        assert_eq!(fs::read(dir.path().join("90015098.jpg")).unwrap(), b"abc");
        assert_eq!(report.summary.renamed, 2);
        assert_eq!(report.summary.errors(), 0);

        let again = rename_and_deduplicate(
            dir.path(),
            &RenameOptions::default(),
            &StreamHasher::default(),
            &RunLogger::disabled(),
        )
        .unwrap();
        assert_eq!(again.summary.renamed, 0);
    }
}
