//! JSON output formatter for duplicate scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "hash": "AF13...",
//!       "size": 51200,
//!       "duplicated_size": 102400,
//!       "files": ["/data/a.bin", "/data/b.bin", "/data/c.bin"]
//!     }
//!   ],
//!   "summary": {
//!     "files_scanned": 100,
//!     "files_considered": 80,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "duplicated_size": 102400,
//!     "path_errors": 0,
//!     "hash_failures": 0,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "DF000"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::duplicates::{CandidateGroup, CandidateStore, ScanSummary};
use crate::error::ExitCode;

use super::sorted_groups;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Full-content BLAKE3 hash (64 uppercase hex characters)
    pub hash: String,
    /// Size of each file in bytes
    pub size: u64,
    /// Bytes held by the redundant copies
    pub duplicated_size: u64,
    /// Absolute paths to all files in the group
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    fn from_group(signature: &str, group: &CandidateGroup) -> Self {
        Self {
            hash: signature.to_string(),
            size: group.size_per_file(),
            duplicated_size: group.duplicated_size(),
            files: group
                .files()
                .iter()
                .map(|record| normalize_path(record.path()))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Non-directory entries visited
    pub files_scanned: usize,
    /// Files that passed the walk rules
    pub files_considered: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Redundant copies across all groups
    pub duplicate_files: usize,
    /// Bytes held by redundant copies
    pub duplicated_size: u64,
    /// Paths that could not be visited
    pub path_errors: usize,
    /// Files that could not be hashed
    pub hash_failures: usize,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DF000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanSummary`] and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            files_scanned: summary.files_scanned,
            files_considered: summary.files_considered,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            duplicated_size: summary.duplicated_size,
            path_errors: summary.path_errors,
            hash_failures: summary.hash_failures,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups, smallest files first
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON document.
    ///
    /// # Example
    ///
    /// ```
    /// use dupfinder::duplicates::{CandidateStore, ScanSummary};
    /// use dupfinder::error::ExitCode;
    /// use dupfinder::output::JsonOutput;
    ///
    /// let store = CandidateStore::new("Full hash check", 2);
    /// let output = JsonOutput::new(&store, &ScanSummary::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(store: &CandidateStore, summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: sorted_groups(store)
                .into_iter()
                .map(|(signature, group)| JsonDuplicateGroup::from_group(signature, group))
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Absolute path if the file still exists, otherwise the path as recorded.
fn normalize_path(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
