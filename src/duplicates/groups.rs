//! Candidate grouping shared by every duplicate phase.
//!
//! # Overview
//!
//! A [`CandidateStore`] maps a signature (file size, then partial hash, then
//! full hash) to the [`CandidateGroup`] of records sharing it. Each phase
//! builds a fresh store from the survivors of the previous one and calls
//! [`CandidateStore::resolve`] to drop failed records and groups that are too
//! small to hold duplicates.
//!
//! # Example
//!
//! ```
//! use dupfinder::duplicates::CandidateStore;
//! use dupfinder::scanner::FileRecord;
//! use std::path::PathBuf;
//!
//! let mut store = CandidateStore::new("File size check", 2);
//! store.add(FileRecord::new(PathBuf::from("/file1.txt"), 1024));
//! store.add(FileRecord::new(PathBuf::from("/file2.txt"), 1024));
//! store.add(FileRecord::new(PathBuf::from("/file3.txt"), 2048));
//!
//! store.resolve(false);
//!
//! assert_eq!(store.num_groups(), 1); // Only the 1024-byte pair survives
//! assert_eq!(store.num_total_files(), 2);
//! assert_eq!(store.total_duplicated_size(), 1024);
//! ```

use std::collections::HashMap;
use std::time::Instant;

use bytesize::ByteSize;

use crate::scanner::FileRecord;

/// Records sharing one signature, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateGroup {
    files: Vec<FileRecord>,
}

impl CandidateGroup {
    /// Records in this group.
    #[must_use]
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Number of records in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Size of one member. Members of a group always share a size once the
    /// group survived the size phase.
    #[must_use]
    pub fn size_per_file(&self) -> u64 {
        self.files.first().map_or(0, FileRecord::size)
    }

    /// Total size of all records in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(FileRecord::size).sum()
    }

    /// Number of redundant copies (all but one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Bytes taken by the redundant copies: `size * (k - 1)`.
    #[must_use]
    pub fn duplicated_size(&self) -> u64 {
        self.size_per_file() * self.duplicate_count() as u64
    }
}

/// Before/after figures captured by [`CandidateStore::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionStats {
    /// Valid records before singleton groups were dropped
    pub files_before: usize,
    /// Records left after resolving
    pub files_after: usize,
    /// Bytes before singleton groups were dropped
    pub bytes_before: u64,
    /// Bytes left after resolving
    pub bytes_after: u64,
}

impl ReductionStats {
    /// Percentage of records eliminated.
    #[must_use]
    pub fn file_reduction(&self) -> f64 {
        reduction_percentage(self.files_before as u64, self.files_after as u64)
    }

    /// Percentage of bytes eliminated.
    #[must_use]
    pub fn size_reduction(&self) -> f64 {
        reduction_percentage(self.bytes_before, self.bytes_after)
    }
}

fn reduction_percentage(before: u64, after: u64) -> f64 {
    if before == 0 {
        0.0
    } else {
        100.0 * (1.0 - after as f64 / before as f64)
    }
}

/// Signature-keyed groups of potential duplicates for one phase.
#[derive(Debug, Clone)]
pub struct CandidateStore {
    name: String,
    groups: HashMap<String, CandidateGroup>,
    min_copies: usize,
    started: Instant,
    reduction: Option<ReductionStats>,
}

impl CandidateStore {
    /// Create an empty store.
    ///
    /// # Arguments
    ///
    /// * `name` - Phase name used in log lines
    /// * `min_copies` - Smallest group kept by [`resolve`](Self::resolve)
    #[must_use]
    pub fn new(name: impl Into<String>, min_copies: usize) -> Self {
        Self {
            name: name.into(),
            groups: HashMap::new(),
            min_copies: min_copies.max(2),
            started: Instant::now(),
            reduction: None,
        }
    }

    /// Build a store from a flat list of records.
    #[must_use]
    pub fn from_records(
        name: impl Into<String>,
        min_copies: usize,
        records: impl IntoIterator<Item = FileRecord>,
    ) -> Self {
        let mut store = Self::new(name, min_copies);
        for record in records {
            store.add(record);
        }
        store
    }

    /// Phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `record` to the group keyed by its signature.
    pub fn add(&mut self, record: FileRecord) {
        match self.groups.get_mut(record.signature()) {
            Some(group) => group.files.push(record),
            None => {
                let key = record.signature().to_string();
                self.groups.insert(
                    key,
                    CandidateGroup {
                        files: vec![record],
                    },
                );
            }
        }
    }

    /// Drop failed records, then every group smaller than the minimum copy
    /// count.
    ///
    /// With `collect_stats` the before/after counts are logged and kept for
    /// [`reduction_stats`](Self::reduction_stats). Calling this again without
    /// adding records leaves the groups unchanged.
    pub fn resolve(&mut self, collect_stats: bool) -> &mut Self {
        let mut failed = 0usize;
        for group in self.groups.values_mut() {
            group.files.retain(|record| {
                if let Some(error) = record.error() {
                    log::trace!("Dropping {}: {}", record.path().display(), error);
                    failed += 1;
                    false
                } else {
                    true
                }
            });
        }
        if failed > 0 {
            log::debug!("{}: dropped {} file(s) with errors", self.name, failed);
        }

        let files_before = self.num_total_files();
        let bytes_before = self.total_size();

        let min_copies = self.min_copies;
        self.groups.retain(|signature, group| {
            if group.len() < min_copies {
                log::trace!(
                    "Eliminated signature {} with {} file(s)",
                    signature,
                    group.len()
                );
                false
            } else {
                true
            }
        });

        log::debug!(
            "{} done after {:.1} seconds",
            self.name,
            self.started.elapsed().as_secs_f64()
        );

        if collect_stats {
            let stats = ReductionStats {
                files_before,
                files_after: self.num_total_files(),
                bytes_before,
                bytes_after: self.total_size(),
            };
            log::debug!(
                "  Optimization stats:\n    File count: {} -> {} ({:.1}% reduction)\n    File size: {} -> {} ({:.1}% reduction)",
                stats.files_before,
                stats.files_after,
                stats.file_reduction(),
                ByteSize::b(stats.bytes_before),
                ByteSize::b(stats.bytes_after),
                stats.size_reduction()
            );
            self.reduction = Some(stats);
        }

        self
    }

    /// Statistics from the last [`resolve`](Self::resolve) with statistics on.
    #[must_use]
    pub fn reduction_stats(&self) -> Option<ReductionStats> {
        self.reduction
    }

    /// Number of groups.
    #[must_use]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Whether the store holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records across all groups.
    #[must_use]
    pub fn num_total_files(&self) -> usize {
        self.groups.values().map(CandidateGroup::len).sum()
    }

    /// Sum of record sizes across all groups.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.groups.values().map(CandidateGroup::total_size).sum()
    }

    /// Redundant copies across all groups: `sum(k - 1)`.
    #[must_use]
    pub fn num_duplicated_files(&self) -> usize {
        self.groups.values().map(CandidateGroup::duplicate_count).sum()
    }

    /// Bytes held by redundant copies: `sum(size * (k - 1))`.
    #[must_use]
    pub fn total_duplicated_size(&self) -> u64 {
        self.groups.values().map(CandidateGroup::duplicated_size).sum()
    }

    /// Read-only view of all groups, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &CandidateGroup)> + '_ {
        self.groups
            .iter()
            .map(|(signature, group)| (signature.as_str(), group))
    }

    /// Group for one signature.
    #[must_use]
    pub fn get(&self, signature: &str) -> Option<&CandidateGroup> {
        self.groups.get(signature)
    }

    /// Lazily map every record across all groups.
    pub fn map_all_files<'a, T, F>(&'a self, f: F) -> impl Iterator<Item = T> + 'a
    where
        F: FnMut(&'a FileRecord) -> T + 'a,
    {
        self.groups
            .values()
            .flat_map(|group| group.files.iter())
            .map(f)
    }

    /// Consume the store, yielding every record.
    pub fn into_records(self) -> impl Iterator<Item = FileRecord> {
        self.groups.into_values().flat_map(|group| group.files)
    }
}
