//! Progress reporting for the duplicate pipeline.
//!
//! Two [`ProgressCallback`] implementations are provided:
//!
//! - [`Progress`]: indicatif bars for interactive terminals
//! - [`LogProgress`]: periodic log lines with task counts, throughput and
//!   free memory, for redirected output and log files

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use sysinfo::System;

use crate::duplicates::SchedulerProgress;

/// Progress callback for duplicate finding phases.
///
/// Implement this trait to receive progress updates during
/// the duplicate detection pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ("walking", "partial hash", "full hash")
    /// * `total` - Total number of items to process, 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called every progress interval while hashing tasks run.
    fn on_progress(&self, progress: &SchedulerProgress);

    /// Called when a phase completes.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    hashing: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupfinder::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            hashing: Mutex::new(None),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn hashing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        if phase == "walking" {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::walking_style());
            pb.set_message("Walking directories");
            pb.enable_steady_tick(Duration::from_millis(100));
            *self.walking.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::hashing_style());
            pb.set_message(phase.to_string());
            *self.hashing.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
        }
    }

    fn on_progress(&self, progress: &SchedulerProgress) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.hashing.lock().unwrap_or_else(PoisonError::into_inner) {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.completed as u64);
            pb.set_message(format!(
                "{}/s",
                ByteSize::b(progress.throughput() as u64)
            ));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let slot = if phase == "walking" {
            &self.walking
        } else {
            &self.hashing
        };
        if let Some(pb) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
            if let Some(len) = pb.length() {
                pb.set_position(len);
            }
            pb.finish_with_message(format!("{phase} complete"));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.hashing.lock().unwrap_or_else(PoisonError::into_inner) {
            pb.set_message(message.to_string());
        } else if let Some(ref pb) = *self.walking.lock().unwrap_or_else(PoisonError::into_inner) {
            pb.set_message(message.to_string());
        }
    }
}

/// Progress reporter writing log lines.
///
/// Each tick logs `Task n / total`, the read throughput and the free system
/// memory.
pub struct LogProgress {
    system: Mutex<System>,
}

impl LogProgress {
    /// Create a log-line reporter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn available_memory(&self) -> u64 {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_memory();
        system.available_memory()
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for LogProgress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if total > 0 {
            log::info!("Starting {} of {} files", phase, total);
        } else {
            log::info!("Starting {}", phase);
        }
    }

    fn on_progress(&self, progress: &SchedulerProgress) {
        log::info!(
            "Task {} / {}, throughput {}/s, free memory {}",
            progress.completed,
            progress.total,
            ByteSize::b(progress.throughput() as u64),
            ByteSize::b(self.available_memory())
        );
    }

    fn on_phase_end(&self, phase: &str) {
        log::debug!("Finished {}", phase);
    }
}
