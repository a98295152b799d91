//! Command-line interface definitions for dupfinder.
//!
//! Every flag overrides the matching [`Settings`] field after the config file
//! and environment have been applied. List flags extend the configured lists
//! rather than replacing them.
//!
//! # Example
//!
//! ```bash
//! # Scan two directories, text report
//! dupfinder ~/Pictures /mnt/backup/Pictures
//!
//! # Only files of 1MB and more, machine-readable output
//! dupfinder --min-size 1MB --output json ~/Downloads
//!
//! # Slow disk: one full read at a time
//! dupfinder --full-reads 1 -v /srv/archive
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{default_worker_threads, Settings};

/// Find duplicate files by size, partial hash and full hash.
///
/// Files are grouped by size first; only same-size files have their leading
/// bytes hashed, and only files that still match are read in full.
#[derive(Debug, Parser)]
#[command(name = "dupfinder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Settings file (TOML). Defaults to config.toml in the platform config directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Minimum file size to consider (e.g., 10KB, 1MB, 1GiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 100MB, 4GiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Minimum number of identical files before a group is reported
    #[arg(long, value_name = "N")]
    pub min_copies: Option<usize>,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip directories whose name contains this term (repeatable)
    #[arg(long = "exclude-dir", value_name = "NAME")]
    pub exclude_dirs: Vec<String>,

    /// Skip paths ending with this suffix (repeatable)
    #[arg(long = "exclude-suffix", value_name = "SUFFIX")]
    pub exclude_suffixes: Vec<String>,

    /// Skip paths containing this term (repeatable)
    #[arg(long = "exclude-term", value_name = "TERM")]
    pub exclude_terms: Vec<String>,

    /// Only keep paths containing this term (repeatable)
    #[arg(long = "include-only", value_name = "TERM")]
    pub include_only: Vec<String>,

    /// Gitignore-style glob pattern to ignore (repeatable)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Bytes read per file by the partial hash (e.g., 128KiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub partial_bytes: Option<u64>,

    /// Files open at once during the partial hash phase
    #[arg(long, value_name = "N")]
    pub simple_reads: Option<usize>,

    /// Files open at once during the full hash phase
    #[arg(long, value_name = "N")]
    pub full_reads: Option<usize>,

    /// Hashing worker threads
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Milliseconds between progress updates
    #[arg(long, value_name = "MS")]
    pub progress_interval: Option<u64>,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Print paths without surrounding quotes in the text report
    #[arg(long)]
    pub no_quotes: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON document for scripting
    Json,
    /// One CSV row per duplicate file
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl Cli {
    /// Apply the command-line overrides on top of `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(min) = self.min_size {
            settings.min_file_size = min;
        }
        if let Some(max) = self.max_size {
            settings.max_file_size = max;
        }
        if let Some(copies) = self.min_copies {
            settings.min_copies = copies;
        }
        if self.follow_symlinks {
            settings.follow_symlinks = true;
        }

        settings.exclude_dirs.extend(self.exclude_dirs.iter().cloned());
        settings
            .exclude_suffixes
            .extend(self.exclude_suffixes.iter().cloned());
        settings.exclude_terms.extend(self.exclude_terms.iter().cloned());
        settings.include_only.extend(self.include_only.iter().cloned());
        settings
            .ignore_patterns
            .extend(self.ignore_patterns.iter().cloned());

        if let Some(bytes) = self.partial_bytes {
            settings.partial_hash_bytes = usize::try_from(bytes).unwrap_or(usize::MAX);
        }
        if let Some(n) = self.simple_reads {
            settings.max_simple_reads = n;
        }
        if let Some(n) = self.full_reads {
            settings.max_full_reads = n;
        }
        match self.threads {
            Some(n) => settings.worker_threads = n,
            None if self.simple_reads.is_some() || self.full_reads.is_some() => {
                settings.worker_threads =
                    default_worker_threads(settings.max_simple_reads, settings.max_full_reads);
            }
            None => {}
        }

        if let Some(ms) = self.progress_interval {
            settings.progress_interval_ms = ms;
        }
        if self.no_progress || self.quiet {
            settings.show_progress = false;
        }
        if self.no_quotes {
            settings.quote_paths = false;
        }
    }
}

/// Size suffixes accepted by [`parse_size`], matched case-insensitively.
const SIZE_UNITS: &[(&str, u64)] = &[
    ("", 1),
    ("B", 1),
    ("K", 1_000),
    ("KB", 1_000),
    ("KIB", 1 << 10),
    ("M", 1_000_000),
    ("MB", 1_000_000),
    ("MIB", 1 << 20),
    ("G", 1_000_000_000),
    ("GB", 1_000_000_000),
    ("GIB", 1 << 30),
    ("T", 1_000_000_000_000),
    ("TB", 1_000_000_000_000),
    ("TIB", 1 << 40),
];

/// Parse a human-readable size string into bytes.
///
/// Decimal suffixes (KB, MB, ...) are powers of 1000, binary suffixes
/// (KiB, MiB, ...) powers of 1024. A bare number is bytes.
///
/// # Examples
///
/// ```
/// use dupfinder::cli::parse_size;
///
/// assert_eq!(parse_size("10000").unwrap(), 10_000);
/// assert_eq!(parse_size("1KB").unwrap(), 1_000);
/// assert_eq!(parse_size("128KiB").unwrap(), 131_072);
/// assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
/// ```
///
/// # Errors
///
/// Returns a message for empty input, a malformed number or an unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let suffix = suffix.trim().to_ascii_uppercase();

    let value: f64 = number
        .parse()
        .map_err(|_| format!("Invalid number: '{number}'"))?;

    let multiplier = SIZE_UNITS
        .iter()
        .find(|(unit, _)| *unit == suffix)
        .map(|&(_, multiplier)| multiplier)
        .ok_or_else(|| format!("Unknown size suffix: '{suffix}'"))?;

    Ok((value * multiplier as f64) as u64)
}
