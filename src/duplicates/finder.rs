//! Duplicate finder orchestrating the refinement pipeline.
//!
//! # Pipeline
//!
//! 1. **Enumerate** - Walk the roots and group files by size
//! 2. **Partial hash** - Regroup survivors by a digest of their first bytes
//! 3. **Full hash** - Regroup survivors by a digest of their whole content
//!
//! Each phase consumes the previous [`CandidateStore`] and resolves a new one,
//! so a file only reaches the expensive full read if another file shares both
//! its size and its leading bytes. Files that fit in the partial window are
//! marked fully hashed after phase 2 and are not read again.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use crate::config::{ConfigError, Settings};
use crate::progress::ProgressCallback;
use crate::scanner::{EnumerationStats, HashMode, Walker};

use super::groups::CandidateStore;
use super::scheduler::{Scheduler, SchedulerError};

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Non-directory entries visited while walking
    pub files_scanned: usize,
    /// Files that passed the walk rules and size bounds
    pub files_considered: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Redundant copies, not counting one original per group
    pub duplicate_files: usize,
    /// Bytes held by redundant copies
    pub duplicated_size: u64,
    /// Paths that could not be visited while walking
    pub path_errors: usize,
    /// Records dropped because hashing failed
    pub hash_failures: usize,
    /// Duration of the entire scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Duplicated bytes as a human-readable string.
    #[must_use]
    pub fn duplicated_size_display(&self) -> String {
        ByteSize::b(self.duplicated_size).to_string()
    }

    /// Whether any path or record failed during the scan.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.path_errors > 0 || self.hash_failures > 0
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The settings cannot drive a scan.
    #[error(transparent)]
    InvalidSettings(#[from] ConfigError),

    /// The scheduler failed to start or hit a fatal error.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl FinderError {
    /// Whether the scan was aborted because the system ran out of memory.
    #[must_use]
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::Scheduler(SchedulerError::ResourceExhausted(_)))
    }
}

/// Duplicate finder that orchestrates the multi-phase detection pipeline.
///
/// # Example
///
/// ```no_run
/// use dupfinder::config::Settings;
/// use dupfinder::duplicates::DuplicateFinder;
/// use std::path::PathBuf;
///
/// let mut finder = DuplicateFinder::new(Settings::default()).unwrap();
/// let (store, summary) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
///
/// println!("Found {} duplicate groups", store.num_groups());
/// println!("Duplicated: {}", summary.duplicated_size_display());
/// ```
pub struct DuplicateFinder {
    settings: Settings,
    scheduler: Scheduler,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    hash_failures: usize,
}

impl DuplicateFinder {
    /// Validate `settings` and start the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidSettings`] for settings that fail
    /// validation and [`FinderError::Scheduler`] if the pool cannot start.
    pub fn new(settings: Settings) -> Result<Self, FinderError> {
        settings.validate()?;
        let scheduler = Scheduler::new(&settings)?;
        Ok(Self {
            settings,
            scheduler,
            progress_callback: None,
            hash_failures: 0,
        })
    }

    /// Report phase progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Settings the finder was built with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Records dropped by hashing since the last
    /// [`find_duplicates`](Self::find_duplicates) started.
    #[must_use]
    pub fn hash_failures(&self) -> usize {
        self.hash_failures
    }

    /// Run all three phases over `roots`.
    ///
    /// # Returns
    ///
    /// A tuple of:
    /// - `CandidateStore` - Groups of files with identical content
    /// - `ScanSummary` - Statistics about the scan
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Scheduler`] if hashing hit a fatal error.
    /// Unreadable paths and files are logged and skipped instead.
    pub fn find_duplicates(
        &mut self,
        roots: &[PathBuf],
    ) -> Result<(CandidateStore, ScanSummary), FinderError> {
        let start_time = Instant::now();
        self.hash_failures = 0;

        let (by_size, walk_stats) = self.enumerate(roots);
        let partial = self.partial_phase(by_size)?;
        let full = self.full_phase(partial)?;

        let summary = ScanSummary {
            files_scanned: walk_stats.files_scanned,
            files_considered: walk_stats.files_added,
            duplicate_groups: full.num_groups(),
            duplicate_files: full.num_duplicated_files(),
            duplicated_size: full.total_duplicated_size(),
            path_errors: walk_stats.path_errors,
            hash_failures: self.hash_failures,
            scan_duration: start_time.elapsed(),
        };

        log::info!(
            "Found {} duplicated files ({}) in {} groups after {:.1} seconds",
            summary.duplicate_files,
            summary.duplicated_size_display(),
            summary.duplicate_groups,
            summary.scan_duration.as_secs_f64()
        );

        Ok((full, summary))
    }

    /// Phase 1: walk `roots` into a resolved size-keyed store.
    pub fn enumerate(&self, roots: &[PathBuf]) -> (CandidateStore, EnumerationStats) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("walking", 0);
        }

        let result = Walker::new(&self.settings).collect(roots);

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("walking");
        }
        result
    }

    /// Phase 2: regroup `store` by partial hash. Reduction stats are logged.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Scheduler`] on a fatal hashing error.
    pub fn partial_phase(&mut self, store: CandidateStore) -> Result<CandidateStore, FinderError> {
        self.hash_phase(store, HashMode::Partial, "Partial hash check", true)
    }

    /// Phase 3: regroup `store` by full hash. Fully hashed records are not
    /// read again.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Scheduler`] on a fatal hashing error.
    pub fn full_phase(&mut self, store: CandidateStore) -> Result<CandidateStore, FinderError> {
        self.hash_phase(store, HashMode::Full, "Full hash check", false)
    }

    fn hash_phase(
        &mut self,
        store: CandidateStore,
        mode: HashMode,
        name: &str,
        collect_stats: bool,
    ) -> Result<CandidateStore, FinderError> {
        let total = store.num_total_files();
        log::info!(
            "{}: hashing {} files ({})",
            name,
            total,
            ByteSize::b(store.total_size())
        );

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(mode.name(), total);
            callback.on_message(name);
        }

        self.scheduler.submit_all(mode, store.into_records());
        let records = self.scheduler.await_all(self.progress_callback.as_deref())?;

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(mode.name());
        }

        let failed = (total - records.len()) + records.iter().filter(|r| r.has_error()).count();
        if failed > 0 {
            log::warn!("{}: {} file(s) could not be hashed", name, failed);
        }
        self.hash_failures += failed;

        let mut next = CandidateStore::from_records(name, self.settings.min_copies, records);
        next.resolve(collect_stats);
        log::info!(
            "{}: {} files remain in {} groups",
            name,
            next.num_total_files(),
            next.num_groups()
        );
        Ok(next)
    }
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("settings", &self.settings)
            .field("scheduler", &self.scheduler)
            .field("has_progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}
