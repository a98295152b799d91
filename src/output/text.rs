//! Human-readable report.
//!
//! ```text
//! DUPLICATED FILES FOUND (sorted by individual file size)
//!
//! Signature: 9F86D081...
//! Size per file: 48.8 KiB
//! Total duplicated size: 97.7 KiB
//!     "/data/a.bin"
//!     "/data/copy/a.bin"
//!     "/backup/a.bin"
//!
//! Finished in 1.3 seconds. Duplicated files: 2, duplicated size: 97.7 KiB
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{CandidateStore, ScanSummary};

use super::sorted_groups;

/// Text report formatter.
pub struct TextOutput<'a> {
    store: &'a CandidateStore,
    summary: &'a ScanSummary,
    quote_paths: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a text report.
    ///
    /// # Arguments
    ///
    /// * `store` - Terminal store of the full hash phase
    /// * `summary` - Scan statistics
    /// * `quote_paths` - Wrap every path in double quotes
    #[must_use]
    pub fn new(store: &'a CandidateStore, summary: &'a ScanSummary, quote_paths: bool) -> Self {
        Self {
            store,
            summary,
            quote_paths,
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.store.is_empty() {
            writeln!(writer, "No duplicated files found")?;
        } else {
            writeln!(
                writer,
                "DUPLICATED FILES FOUND (sorted by individual file size)"
            )?;
            for (signature, group) in sorted_groups(self.store) {
                writeln!(writer)?;
                writeln!(writer, "Signature: {signature}")?;
                writeln!(writer, "Size per file: {}", ByteSize::b(group.size_per_file()))?;
                writeln!(
                    writer,
                    "Total duplicated size: {}",
                    ByteSize::b(group.duplicated_size())
                )?;
                for file in group.files() {
                    if self.quote_paths {
                        writeln!(writer, "    \"{}\"", file.path().display())?;
                    } else {
                        writeln!(writer, "    {}", file.path().display())?;
                    }
                }
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Finished in {:.1} seconds. Duplicated files: {}, duplicated size: {}",
            self.summary.scan_duration.as_secs_f64(),
            self.summary.duplicate_files,
            self.summary.duplicated_size_display()
        )?;
        if self.summary.has_errors() {
            writeln!(
                writer,
                "Skipped {} unreadable path(s) and {} unreadable file(s)",
                self.summary.path_errors, self.summary.hash_failures
            )?;
        }
        Ok(())
    }

    /// Render the report into a string.
    ///
    /// # Errors
    ///
    /// Only fails if the report is not valid UTF-8, which cannot happen with
    /// lossy path rendering.
    pub fn render(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
