//! Directory walker built on walkdir.
//!
//! # Overview
//!
//! [`Walker`] visits every root depth-first and turns each regular file that
//! passes the configured rules into a [`FileRecord`]. The result is a
//! size-keyed [`CandidateStore`], already resolved, so only sizes shared by at
//! least `min_copies` files reach the hashing phases.
//!
//! # Rules
//!
//! Applied in this order, each rejection counting as a rule exclusion:
//!
//! - Directory names containing an `exclude_dirs` term (whole subtree skipped,
//!   roots included)
//! - `include_only` allow-list
//! - `exclude_suffixes`
//! - `exclude_terms`
//! - Gitignore-style `ignore_patterns` via the `ignore` crate
//! - Regular-file check
//! - Readable check: files the user may not open are skipped like any other
//!   rule rejection, without a warning
//! - Size bounds
//!
//! # Errors
//!
//! A root that cannot be read is logged as an error and abandoned; other roots
//! continue. Access-denied entries are skipped quietly. Any other failure is
//! warned about when `log_path_errors` is on and the walk carries on.

use std::collections::HashSet;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::config::Settings;
use crate::duplicates::CandidateStore;

use super::{FileRecord, ScanError};

/// Counters gathered while enumerating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    /// Non-directory entries visited
    pub files_scanned: usize,
    /// Files that became candidate records
    pub files_added: usize,
    /// Directories visited, roots included
    pub directories: usize,
    /// Entries or subtrees rejected by a rule
    pub rule_exclusions: usize,
    /// Paths that could not be visited
    pub path_errors: usize,
}

/// Depth-first file enumerator.
#[derive(Debug, Clone)]
pub struct Walker {
    settings: Settings,
}

impl Walker {
    /// Create a walker for the given settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Walk every root and collect the size-keyed candidate store.
    ///
    /// Each path is added at most once even when roots overlap.
    pub fn collect(&self, roots: &[PathBuf]) -> (CandidateStore, EnumerationStats) {
        let mut store = CandidateStore::new("File size check", self.settings.min_copies);
        let mut stats = EnumerationStats::default();
        let mut seen = HashSet::new();
        let mut last_report = Instant::now();

        for root in roots {
            log::debug!("Scanning {}", root.display());
            self.walk_root(root, &mut store, &mut stats, &mut seen, &mut last_report);
        }

        log::info!(
            "Enumerated {} files in {} directories: {} added, {} excluded by rules, {} path errors",
            stats.files_scanned,
            stats.directories,
            stats.files_added,
            stats.rule_exclusions,
            stats.path_errors
        );

        store.resolve(true);
        (store, stats)
    }

    fn walk_root(
        &self,
        root: &Path,
        store: &mut CandidateStore,
        stats: &mut EnumerationStats,
        seen: &mut HashSet<PathBuf>,
        last_report: &mut Instant,
    ) {
        let gitignore = self.build_gitignore(root);
        let exclude_dirs = &self.settings.exclude_dirs;
        let mut excluded_dirs = 0usize;

        let walk = WalkDir::new(root)
            .follow_links(self.settings.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.file_type().is_dir() && is_excluded_dir(entry, exclude_dirs) {
                    log::trace!("Skipping excluded directory: {}", entry.path().display());
                    excluded_dirs += 1;
                    false
                } else {
                    true
                }
            });

        for result in walk {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    let depth = err.depth();
                    let error = classify_error(err);
                    stats.path_errors += 1;
                    if depth == 0 {
                        log::error!("Unable to scan {}: {}", root.display(), error);
                        break;
                    }
                    self.report_path_error(&error);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                stats.directories += 1;
            } else {
                stats.files_scanned += 1;
                match self.accept(root, &entry, gitignore.as_ref()) {
                    Some(record) if record.has_error() => {
                        stats.path_errors += 1;
                        if self.settings.log_path_errors {
                            log::warn!("{}: {}", record, record.error().unwrap_or_default());
                        }
                    }
                    Some(record) => {
                        if seen.insert(record.path().to_path_buf()) {
                            store.add(record);
                            stats.files_added += 1;
                        }
                    }
                    None => stats.rule_exclusions += 1,
                }
            }

            if self.settings.show_progress
                && last_report.elapsed() >= self.settings.progress_interval()
            {
                log::info!(
                    "Files added/scanned: {}/{}, directories scanned: {}",
                    stats.files_added,
                    stats.files_scanned,
                    stats.directories
                );
                *last_report = Instant::now();
            }
        }

        stats.rule_exclusions += excluded_dirs;
    }

    /// Apply the file rules to one non-directory entry.
    ///
    /// `None` means a rule rejected it. A record whose size could not be
    /// fetched is returned in its error state.
    fn accept(
        &self,
        root: &Path,
        entry: &DirEntry,
        gitignore: Option<&Gitignore>,
    ) -> Option<FileRecord> {
        let path = entry.path();
        let path_str = path.to_string_lossy();
        let settings = &self.settings;

        if !settings.include_only.is_empty()
            && !settings
                .include_only
                .iter()
                .any(|term| path_str.contains(term.as_str()))
        {
            log::trace!("Not in include list: {}", path.display());
            return None;
        }

        if settings
            .exclude_suffixes
            .iter()
            .any(|suffix| path_str.ends_with(suffix.as_str()))
        {
            log::trace!("Excluded by suffix: {}", path.display());
            return None;
        }

        if settings
            .exclude_terms
            .iter()
            .any(|term| path_str.contains(term.as_str()))
        {
            log::trace!("Excluded by term: {}", path.display());
            return None;
        }

        if let Some(gitignore) = gitignore {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if gitignore
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
            {
                log::trace!("Ignored by pattern: {}", path.display());
                return None;
            }
        }

        if !entry.file_type().is_file() {
            log::trace!("Not a regular file: {}", path.display());
            return None;
        }

        if let Err(e) = File::open(path) {
            if e.kind() == ErrorKind::PermissionDenied {
                log::trace!("Not readable: {}", path.display());
                return None;
            }
        }

        let record = FileRecord::from_path(path.to_path_buf());
        if record.has_error() || record.is_valid(settings) {
            Some(record)
        } else {
            log::trace!("Outside size bounds ({}): {}", record.size(), path.display());
            None
        }
    }

    /// Build the glob matcher for one root from the configured patterns.
    fn build_gitignore(&self, root: &Path) -> Option<Gitignore> {
        if self.settings.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(root);
        for pattern in &self.settings.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn report_path_error(&self, error: &ScanError) {
        if error.is_access_denied() {
            log::debug!("{}", error);
        } else if self.settings.log_path_errors {
            log::warn!("{}", error);
        }
    }
}

fn is_excluded_dir(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    exclude_dirs.iter().any(|term| name.contains(term.as_str()))
}

fn classify_error(err: walkdir::Error) -> ScanError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    if err.loop_ancestor().is_some() {
        return ScanError::Loop(path);
    }

    let io_error = std::io::Error::from(err);
    match io_error.kind() {
        ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
        ErrorKind::NotFound => ScanError::NotFound(path),
        _ => ScanError::Io {
            path,
            source: io_error,
        },
    }
}
