//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Depth-first directory walking with rule-based exclusions
//! - Partial and full content hashing with BLAKE3
//! - The [`FileRecord`] tracked through every duplicate phase
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::config::Settings;
//! use dupfinder::scanner::Walker;
//! use std::path::PathBuf;
//!
//! let settings = Settings {
//!     min_file_size: 1024, // Skip files under 1KB
//!     ..Settings::default()
//! };
//!
//! let walker = Walker::new(&settings);
//! let (store, stats) = walker.collect(&[PathBuf::from(".")]);
//! println!("{} candidates, {} excluded by rules", store.num_total_files(), stats.rule_exclusions);
//! ```

pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};

use crate::config::Settings;

// Re-export main types
pub use hasher::{hash_to_hex, ContentHasher, Digest, Hash, HashMode, PendingDigest};
pub use walker::{EnumerationStats, Walker};

/// One tracked file.
///
/// The size is fetched once when the record is created. The signature starts
/// as the decimal size and is replaced by a hash digest in later phases.
/// A record that carries an error is dropped by the next
/// [`CandidateStore::resolve`](crate::duplicates::CandidateStore::resolve).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    path: PathBuf,
    size: u64,
    signature: String,
    fully_hashed: bool,
    error: Option<String>,
}

impl FileRecord {
    /// Create a record for a file whose size is already known.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            signature: size.to_string(),
            fully_hashed: false,
            error: None,
        }
    }

    /// Create a record by querying the file size from the filesystem.
    ///
    /// If the size cannot be fetched the record is created in the error
    /// state with a size of zero and will never be grouped.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Self {
        match std::fs::metadata(&path) {
            Ok(metadata) => Self::new(path, metadata.len()),
            Err(e) => {
                let mut record = Self::new(path, 0);
                record.set_error(format!("unable to fetch file size: {e}"));
                record
            }
        }
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes, as seen at creation.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current grouping key.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Whether a hash has already covered the whole file.
    #[must_use]
    pub fn is_fully_hashed(&self) -> bool {
        self.fully_hashed
    }

    /// Error recorded while processing this file, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether an error has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Mark the record as failed. It will be excluded from every later group.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Whether the record may enter a candidate group under `settings`.
    #[must_use]
    pub fn is_valid(&self, settings: &Settings) -> bool {
        self.error.is_none() && settings.accepts_size(self.size)
    }

    /// Replace the signature with a finished digest.
    ///
    /// The record becomes fully hashed once the digest covered at least
    /// `size` bytes; it never goes back to partially hashed.
    pub fn apply_digest(&mut self, digest: &Digest) {
        self.signature = digest.hex();
        self.fully_hashed = self.fully_hashed || digest.bytes_read >= self.size;
    }
}

impl std::fmt::Display for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The walker reported a filesystem loop while following symlinks.
    #[error("Filesystem loop at {0}")]
    Loop(PathBuf),
}

impl ScanError {
    /// Whether this is an access-denied failure, which is never reported.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The system ran out of memory while reading the file.
    #[error("Out of memory while reading {0}")]
    ResourceExhausted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::OutOfMemory => Self::ResourceExhausted(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Whether the failure leaves the whole process in an unreliable state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }
}
