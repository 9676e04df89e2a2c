//! File scanning and duplicate grouping

pub mod file_scanner;
pub mod duplicate_detector;

pub use file_scanner::{collect_image_files, is_image_file};
pub use duplicate_detector::{group_by_digest, partition_by_content, DigestGroup, HashPass};
