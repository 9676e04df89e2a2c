//! Hash Rename Library
//!
//! Renames image files to a prefix of their content digest and removes
//! byte-identical duplicates from a single directory.

pub mod core;
pub mod scanner;
pub mod reporting;

pub use crate::core::renamer;
pub use crate::scanner::file_scanner;
pub use crate::reporting::report_writer;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::core::error::{FileError, Stage};
    pub use crate::core::hasher::{
        compute_file_hash, ContentHasher, HashAlgorithm, StreamHasher, DEFAULT_BUFFER_SIZE,
    };
    pub use crate::core::renamer::{
        rename_and_deduplicate, resolve_target, RenameOptions, DEFAULT_PREFIX_LEN,
    };
    pub use crate::scanner::file_scanner::{collect_image_files, is_image_file, IMAGE_EXTENSIONS};
    pub use crate::scanner::duplicate_detector::{
        files_identical, group_by_digest, partition_by_content, DigestGroup, HashPass,
    };
    pub use crate::reporting::logger::{LevelFilter, LogConfig, RunLogger, DEFAULT_LOG_FILE};
    pub use crate::reporting::report_writer::{
        write_json_report, write_report, Action, RunReport, RunSummary,
    };
}
