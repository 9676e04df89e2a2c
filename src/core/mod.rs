//! Hashing and the deduplicate/rename routine

pub mod error;
pub mod hasher;
pub mod renamer;

pub use error::{FileError, Stage};
pub use hasher::{compute_file_hash, ContentHasher, HashAlgorithm, StreamHasher};
pub use renamer::{rename_and_deduplicate, RenameOptions};
