//! Streaming content digests

use clap::ValueEnum;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::error::FileError;

/// Read buffer used when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 65536;

/// Digest algorithm used to identify file content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

/// Source of content digests for the hash pass
pub trait ContentHasher {
    fn digest(&self, path: &Path) -> Result<String, FileError>;
}

/// Hashes files by streaming them through a fixed-size buffer
#[derive(Debug, Clone, Copy)]
pub struct StreamHasher {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl StreamHasher {
    /// A zero buffer size is raised to one byte.
    pub fn new(algorithm: HashAlgorithm, buffer_size: usize) -> Self {
        Self {
            algorithm,
            buffer_size: buffer_size.max(1),
        }
    }
}

impl Default for StreamHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default(), DEFAULT_BUFFER_SIZE)
    }
}

impl ContentHasher for StreamHasher {
    fn digest(&self, path: &Path) -> Result<String, FileError> {
        compute_file_hash(path, self.algorithm, self.buffer_size)
    }
}

/// Compute the hex digest of a file
///
/// # Arguments
/// * `path` - Path to the file
/// * `algorithm` - Digest algorithm
/// * `buffer_size` - Bytes read per call
///
/// # Returns
/// Lowercase hex digest, or `FileError::Hash` if the file cannot be opened or read
pub fn compute_file_hash(
    path: &Path,
    algorithm: HashAlgorithm,
    buffer_size: usize,
) -> Result<String, FileError> {
    let hash = || -> io::Result<String> {
        let mut file = File::open(path)?;
        let hex = match algorithm {
            HashAlgorithm::Md5 => {
                let mut hasher = Md5::new();
                stream_into(&mut hasher, &mut file, buffer_size)?;
                format!("{:x}", hasher.finalize())
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                stream_into(&mut hasher, &mut file, buffer_size)?;
                format!("{:x}", hasher.finalize())
            }
        };
        Ok(hex)
    };

    hash().map_err(|source| FileError::Hash {
        path: path.to_path_buf(),
        source,
    })
}

fn stream_into(hasher: &mut impl Digest, reader: &mut impl Read, buffer_size: usize) -> io::Result<()> {
    let mut buffer = vec![0u8; buffer_size.max(1)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(())
}
