//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`ContentHasher`] digests either a bounded prefix of a file
//! ([`HashMode::Partial`]) or its whole content ([`HashMode::Full`]).
//! Reading and finalizing are split: [`ContentHasher::read`] returns a
//! [`PendingDigest`] once the file handle is closed, so callers that limit
//! concurrent reads can give their slot back before the digest is finalized.
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::scanner::{ContentHasher, HashMode};
//! use std::path::Path;
//!
//! let hasher = ContentHasher::new(4096, 64 * 1024);
//! let digest = hasher.hash(Path::new("file.bin"), HashMode::Partial).unwrap();
//! println!("{} ({} bytes read)", digest.hex(), digest.bytes_read);
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::config::Settings;

use super::HashError;

/// BLAKE3 digest bytes.
pub type Hash = [u8; 32];

/// Which part of a file a hash covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashMode {
    /// At most the configured window from the start of the file.
    Partial,
    /// The entire file.
    Full,
}

impl HashMode {
    /// Short lowercase name used in log lines and progress phases.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Partial => "partial hash",
            Self::Full => "full hash",
        }
    }
}

impl std::fmt::Display for HashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A finalized digest and the number of bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    /// Raw digest bytes
    pub hash: Hash,
    /// Bytes fed into the digest
    pub bytes_read: u64,
}

impl Digest {
    /// Uppercase hexadecimal rendering, always 64 characters.
    #[must_use]
    pub fn hex(&self) -> String {
        hash_to_hex(&self.hash)
    }
}

/// Digest state left over after the file handle has been closed.
///
/// If the read failed, [`PendingDigest::error`] is set and the state only
/// covers the bytes read before the failure.
pub struct PendingDigest {
    state: blake3::Hasher,
    bytes_read: u64,
    error: Option<HashError>,
}

impl PendingDigest {
    /// Bytes consumed from the file.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&HashError> {
        self.error.as_ref()
    }

    /// Finalize the digest, handing back the read error if there was one.
    #[must_use]
    pub fn finalize(self) -> (Digest, Option<HashError>) {
        let digest = Digest {
            hash: *self.state.finalize().as_bytes(),
            bytes_read: self.bytes_read,
        };
        (digest, self.error)
    }
}

/// Streaming BLAKE3 file hasher.
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    partial_bytes: usize,
    buffer_size: usize,
}

impl ContentHasher {
    /// Create a hasher.
    ///
    /// # Arguments
    ///
    /// * `partial_bytes` - Window read by [`HashMode::Partial`]
    /// * `buffer_size` - Chunk size used by [`HashMode::Full`]
    #[must_use]
    pub fn new(partial_bytes: usize, buffer_size: usize) -> Self {
        Self {
            partial_bytes: partial_bytes.max(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Create a hasher from scan settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.partial_hash_bytes, settings.read_buffer_size)
    }

    /// Read `path` according to `mode` and feed the bytes into a digest.
    ///
    /// The file is closed before this returns. Errors do not abort with
    /// `Err`; they are carried in the returned [`PendingDigest`].
    #[must_use]
    pub fn read(&self, path: &Path, mode: HashMode) -> PendingDigest {
        let mut pending = PendingDigest {
            state: blake3::Hasher::new(),
            bytes_read: 0,
            error: None,
        };

        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                pending.error = Some(HashError::from_io(path, e));
                return pending;
            }
        };

        let (limit, chunk) = match mode {
            HashMode::Partial => (Some(self.partial_bytes as u64), self.partial_bytes),
            HashMode::Full => (None, self.buffer_size),
        };
        let mut buffer = vec![0u8; chunk];

        loop {
            let want = match limit {
                Some(limit) => {
                    let remaining = limit.saturating_sub(pending.bytes_read);
                    remaining.min(buffer.len() as u64) as usize
                }
                None => buffer.len(),
            };
            if want == 0 {
                break;
            }

            match file.read(&mut buffer[..want]) {
                Ok(0) => break,
                Ok(n) => {
                    pending.state.update(&buffer[..n]);
                    pending.bytes_read += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("I/O error while hashing {}: {}", path.display(), e);
                    pending.error = Some(HashError::from_io(path, e));
                    break;
                }
            }
        }

        pending
    }

    /// Read and finalize in one step.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file could not be opened or read.
    pub fn hash(&self, path: &Path, mode: HashMode) -> Result<Digest, HashError> {
        match self.read(path, mode).finalize() {
            (digest, None) => Ok(digest),
            (_, Some(e)) => Err(e),
        }
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Render a digest as uppercase hexadecimal.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;

    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02X}");
        out
    })
}
