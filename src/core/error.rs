//! Per-file error taxonomy
//!
//! None of these abort a run. They are logged at the file boundary, counted
//! in the summary and the offending file is left where it is.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Step of the run in which a per-file error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Hash,
    Delete,
    Rename,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Hash => "hash",
            Stage::Delete => "delete",
            Stage::Rename => "rename",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to hash {}: {source}", .path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename {} -> {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    pub fn stage(&self) -> Stage {
        match self {
            FileError::Hash { .. } => Stage::Hash,
            FileError::Delete { .. } => Stage::Delete,
            FileError::Rename { .. } => Stage::Rename,
        }
    }

    /// The file the error is about (the source side of a rename)
    pub fn path(&self) -> &Path {
        match self {
            FileError::Hash { path, .. } | FileError::Delete { path, .. } => path,
            FileError::Rename { from, .. } => from,
        }
    }
}

/// File name only, falling back to the whole path
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
