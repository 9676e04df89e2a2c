//! Run summary and report writing

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::error::{FileError, Stage};
use crate::reporting::logger::RunLogger;

/// Counters accumulated over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub scanned: usize,
    pub renamed: usize,
    pub duplicates_removed: usize,
    pub hash_errors: usize,
    pub delete_errors: usize,
    pub rename_errors: usize,
}

impl RunSummary {
    pub fn record_error(&mut self, stage: Stage) {
        match stage {
            Stage::Hash => self.hash_errors += 1,
            Stage::Delete => self.delete_errors += 1,
            Stage::Rename => self.rename_errors += 1,
        }
    }

    pub fn errors(&self) -> usize {
        self.hash_errors + self.delete_errors + self.rename_errors
    }

    /// Files still in the directory after the run
    ///
    /// Only successful deletions remove files, so this holds even when
    /// renames or deletions fail and for files that could not be hashed.
    pub fn retained(&self) -> usize {
        self.scanned.saturating_sub(self.duplicates_removed)
    }

    /// Emit the summary block through the run logger
    pub fn log(&self, log: &RunLogger) {
        log.info("===== Summary =====");
        log.info(format!("Total files scanned: {}", self.scanned));
        log.info(format!("Files renamed: {}", self.renamed));
        log.info(format!("Duplicates removed: {}", self.duplicates_removed));
        log.info(format!("Errors: {}", self.errors()));
        if self.hash_errors > 0 {
            log.info(format!("Left unhashed: {}", self.hash_errors));
        }
        log.info(format!("Final files retained: {}", self.retained()));
    }
}

/// One filesystem effect (or failed attempt) of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Renamed {
        from: PathBuf,
        to: PathBuf,
        digest: String,
    },
    Removed {
        path: PathBuf,
        digest: String,
    },
    Failed {
        path: PathBuf,
        stage: Stage,
        message: String,
    },
}

impl From<&FileError> for Action {
    fn from(err: &FileError) -> Self {
        Action::Failed {
            path: err.path().to_path_buf(),
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

/// Everything a run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub directory: PathBuf,
    pub summary: RunSummary,
    pub actions: Vec<Action>,
}

impl RunReport {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn renamed(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.actions.iter().filter_map(|a| match a {
            Action::Renamed { from, to, .. } => Some((from.as_path(), to.as_path())),
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = &Path> {
        self.actions.iter().filter_map(|a| match a {
            Action::Removed { path, .. } => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| matches!(a, Action::Failed { .. }))
    }
}

/// Write a run report as text
///
/// # Arguments
/// * `output_path` - Path to output file
/// * `report` - Report of the finished run
pub fn write_report(output_path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report {}", output_path.display()))?;
    let mut file = BufWriter::new(file);
    let summary = &report.summary;

    writeln!(file, "Hash Rename Report")?;
    writeln!(file, "==================")?;
    writeln!(file, "Generated: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file, "Directory: {}", report.directory.display())?;
    writeln!(file)?;

    writeln!(file, "Summary Statistics:")?;
    writeln!(file, "-------------------")?;
    writeln!(file, "  Total files scanned: {}", summary.scanned)?;
    writeln!(file, "  Files renamed: {}", summary.renamed)?;
    writeln!(file, "  Duplicates removed: {}", summary.duplicates_removed)?;
    writeln!(file, "  Errors: {}", summary.errors())?;
    writeln!(file, "  Final files retained: {}", summary.retained())?;
    writeln!(file)?;

    let renamed: Vec<_> = report.renamed().collect();
    if !renamed.is_empty() {
        writeln!(file, "Renamed Files:")?;
        writeln!(file, "--------------")?;
        for (from, to) in renamed {
            writeln!(file, "  {} -> {}", from.display(), to.display())?;
        }
        writeln!(file)?;
    }

    let removed: Vec<_> = report.removed().collect();
    if !removed.is_empty() {
        writeln!(file, "Removed Duplicates:")?;
        writeln!(file, "-------------------")?;
        for path in removed {
            writeln!(file, "  {}", path.display())?;
        }
        writeln!(file)?;
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        writeln!(file, "Errors:")?;
        writeln!(file, "-------")?;
        for failure in failures {
            if let Action::Failed { stage, message, .. } = failure {
                writeln!(file, "  [{}] {}", stage, message)?;
            }
        }
        writeln!(file)?;
    }

    file.flush()?;
    Ok(())
}

/// Write a run report as pretty-printed JSON
pub fn write_json_report(output_path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report {}", output_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .context("Failed to write JSON report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tempfile::NamedTempFile;

    fn sample_report() -> RunReport {
        let mut report = RunReport::new(Path::new("/photos"));
        report.summary = RunSummary {
            scanned: 4,
            renamed: 1,
            duplicates_removed: 1,
            hash_errors: 1,
            delete_errors: 0,
            rename_errors: 0,
        };
        report.actions = vec![
            Action::Removed {
                path: PathBuf::from("/photos/b.jpg"),
                digest: "900150983cd24fb0d6963f7d28e17f72".to_string(),
            },
            Action::Renamed {
                from: PathBuf::from("/photos/a.jpg"),
                to: PathBuf::from("/photos/90015098.jpg"),
                digest: "900150983cd24fb0d6963f7d28e17f72".to_string(),
            },
            Action::from(&FileError::Hash {
                path: PathBuf::from("/photos/locked.jpg"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            }),
        ];
        report
    }

    #[test]
    fn test_retained_ignores_failed_operations() {
        let summary = RunSummary {
            scanned: 10,
            renamed: 5,
            duplicates_removed: 3,
            hash_errors: 1,
            delete_errors: 1,
            rename_errors: 1,
        };
        assert_eq!(summary.errors(), 3);
        assert_eq!(summary.retained(), 7);
    }

    #[test]
    fn test_record_error() {
        let mut summary = RunSummary::default();
        summary.record_error(Stage::Hash);
        summary.record_error(Stage::Rename);
        summary.record_error(Stage::Rename);
        assert_eq!(summary.hash_errors, 1);
        assert_eq!(summary.delete_errors, 0);
        assert_eq!(summary.rename_errors, 2);
        assert_eq!(summary.errors(), 3);
    }

    #[test]
    fn test_write_report() {
        let temp_file = NamedTempFile::new().unwrap();
        write_report(temp_file.path(), &sample_report()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Total files scanned: 4"));
        assert!(content.contains("Duplicates removed: 1"));
        assert!(content.contains("Final files retained: 3"));
        assert!(content.contains("/photos/a.jpg -> /photos/90015098.jpg"));
        assert!(content.contains("[hash] failed to hash /photos/locked.jpg: permission denied"));
    }

    #[test]
    fn test_write_json_report() {
        let temp_file = NamedTempFile::new().unwrap();
        write_json_report(temp_file.path(), &sample_report()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["summary"]["scanned"], 4);
        assert_eq!(value["actions"][0]["action"], "removed");
        assert_eq!(value["actions"][1]["to"], "/photos/90015098.jpg");
        assert_eq!(value["actions"][2]["stage"], "hash");
    }
}
