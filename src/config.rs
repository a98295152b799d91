//! Scan settings.
//!
//! All tunables of the duplicate pipeline live in one immutable [`Settings`]
//! value that is built before the scan starts and handed to the enumerator,
//! the scheduler and the finder. Settings are layered with figment:
//!
//! 1. Built-in defaults
//! 2. A TOML config file (explicit path, or the platform config directory)
//! 3. Environment variables prefixed with `DUPFINDER_`
//! 4. CLI flags (applied by [`crate::cli::Cli::apply_to`])
//!
//! # Example
//!
//! ```
//! use dupfinder::config::Settings;
//!
//! let settings = Settings::default();
//! assert_eq!(settings.min_copies, 2);
//! assert!(settings.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "DUPFINDER_";

/// Default number of bytes read by the partial hash.
///
/// Kept high so that most small files are fully hashed in the cheap phase
/// and never need to be read again.
pub const DEFAULT_PARTIAL_HASH_BYTES: usize = 131_072;

/// Errors produced while loading or validating settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The config file named on the command line does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// figment failed to merge or extract the layered settings.
    #[error("Failed to load settings: {0}")]
    Load(#[from] figment::Error),

    /// A value is outside its allowed range.
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Immutable configuration for one duplicate scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bytes read from the start of each file during the partial hash phase.
    pub partial_hash_bytes: usize,
    /// Chunk size for full-content reads.
    pub read_buffer_size: usize,
    /// Files smaller than this are never considered.
    pub min_file_size: u64,
    /// Files larger than this are never considered.
    pub max_file_size: u64,
    /// Minimum number of copies before a group is reported.
    pub min_copies: usize,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Directory names whose whole subtree is skipped.
    pub exclude_dirs: Vec<String>,
    /// Paths ending with any of these are skipped.
    pub exclude_suffixes: Vec<String>,
    /// Paths containing any of these are skipped.
    pub exclude_terms: Vec<String>,
    /// If non-empty, only paths containing one of these survive.
    pub include_only: Vec<String>,
    /// Gitignore-style glob patterns to ignore.
    pub ignore_patterns: Vec<String>,
    /// Concurrent file reads allowed during the partial hash phase.
    pub max_simple_reads: usize,
    /// Concurrent file reads allowed during the full hash phase.
    pub max_full_reads: usize,
    /// Size of the hashing worker pool.
    pub worker_threads: usize,
    /// Interval between progress updates, in milliseconds.
    pub progress_interval_ms: u64,
    /// Emit periodic progress updates.
    pub show_progress: bool,
    /// Warn about paths that could not be visited.
    pub log_path_errors: bool,
    /// Wrap paths in quotes in the text report.
    pub quote_paths: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let max_simple_reads = 12;
        let max_full_reads = 2;
        Self {
            partial_hash_bytes: DEFAULT_PARTIAL_HASH_BYTES,
            read_buffer_size: DEFAULT_PARTIAL_HASH_BYTES * 2,
            min_file_size: 10_000,
            max_file_size: u64::MAX,
            min_copies: 2,
            follow_symlinks: false,
            exclude_dirs: vec![
                "$RECYCLE.BIN".to_string(),
                "System Volume Information".to_string(),
                "lost+found".to_string(),
            ],
            exclude_suffixes: vec![".git".to_string(), ".class".to_string()],
            exclude_terms: Vec::new(),
            include_only: Vec::new(),
            ignore_patterns: Vec::new(),
            max_simple_reads,
            max_full_reads,
            worker_threads: default_worker_threads(max_simple_reads, max_full_reads),
            progress_interval_ms: 8_000,
            show_progress: true,
            log_path_errors: true,
            quote_paths: true,
        }
    }
}

/// Worker pool size: one more than the widest read ceiling, capped at
/// one more than the number of CPUs.
#[must_use]
pub fn default_worker_threads(max_simple_reads: usize, max_full_reads: usize) -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (max_simple_reads.max(max_full_reads) + 1).min(cpus + 1)
}

impl Settings {
    /// Load layered settings.
    ///
    /// `config_file` must exist when given. Without it the platform config
    /// file (`config.toml` in the dupfinder config directory) is used if
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unparsable, or the
    /// merged values fail [`Settings::validate`].
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                log::debug!("Loading settings from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_config_path().filter(|p| p.is_file()) {
                    log::debug!("Loading settings from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        let settings: Self = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Platform-specific default config file location.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupfinder", "dupfinder")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check that the settings can drive a scan.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("partial_hash_bytes", self.partial_hash_bytes),
            ("read_buffer_size", self.read_buffer_size),
            ("max_simple_reads", self.max_simple_reads),
            ("max_full_reads", self.max_full_reads),
            ("worker_threads", self.worker_threads),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.min_copies < 2 {
            return Err(ConfigError::Invalid {
                field: "min_copies",
                reason: format!("must be at least 2, got {}", self.min_copies),
            });
        }

        if self.min_file_size > self.max_file_size {
            return Err(ConfigError::Invalid {
                field: "min_file_size",
                reason: format!(
                    "{} exceeds max_file_size {}",
                    self.min_file_size, self.max_file_size
                ),
            });
        }

        Ok(())
    }

    /// Whether a file of `size` bytes falls inside the configured bounds.
    #[must_use]
    pub fn accepts_size(&self, size: u64) -> bool {
        size >= self.min_file_size && size <= self.max_file_size
    }

    /// Progress interval as a [`std::time::Duration`].
    #[must_use]
    pub fn progress_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.partial_hash_bytes, 131_072);
        assert_eq!(settings.read_buffer_size, 262_144);
        assert_eq!(settings.min_file_size, 10_000);
        assert_eq!(settings.max_simple_reads, 12);
        assert_eq!(settings.max_full_reads, 2);
        assert!(settings.exclude_dirs.contains(&"lost+found".to_string()));
    }

    #[test]
    fn test_default_worker_threads_bounds() {
        let threads = default_worker_threads(12, 2);
        assert!(threads >= 2);
        assert!(threads <= 13);
    }

    #[test]
    fn test_validate_rejects_zero_permits() {
        let settings = Settings {
            max_full_reads: 0,
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("max_full_reads"));
    }

    #[test]
    fn test_validate_rejects_single_copy() {
        let settings = Settings {
            min_copies: 1,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                field: "min_copies",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_size_bounds() {
        let settings = Settings {
            min_file_size: 100,
            max_file_size: 10,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_accepts_size() {
        let settings = Settings {
            min_file_size: 10,
            max_file_size: 20,
            ..Settings::default()
        };
        assert!(!settings.accepts_size(9));
        assert!(settings.accepts_size(10));
        assert!(settings.accepts_size(20));
        assert!(!settings.accepts_size(21));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Settings::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
