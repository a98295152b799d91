//! Bounded hashing scheduler.
//!
//! # Overview
//!
//! [`Scheduler`] owns a rayon worker pool and one permit pool per
//! [`HashMode`]. Every submitted record becomes one task that:
//!
//! 1. Returns immediately for a full hash of an already fully hashed record
//! 2. Waits for a permit of its mode
//! 3. Reads the file through [`ContentHasher::read`]
//! 4. Gives the permit back
//! 5. Finalizes the digest and stores it as the record's new signature
//!
//! The permit ceiling, not the worker count, bounds how many files are open
//! at once. Finished tasks report over a channel; [`Scheduler::await_all`]
//! drains it and samples [`SchedulerProgress`] on a timer while waiting.
//!
//! # Failures
//!
//! An I/O failure is stored on the record, which the next
//! [`CandidateStore::resolve`](super::CandidateStore::resolve) drops. A
//! panicking task is logged and its record dropped. Running out of memory is
//! fatal: [`Scheduler::await_all`] returns [`SchedulerError::ResourceExhausted`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::config::Settings;
use crate::progress::ProgressCallback;
use crate::scanner::{ContentHasher, FileRecord, HashError, HashMode};

/// Errors raised by the scheduler.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// A task ran out of memory; results can no longer be trusted.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(#[source] HashError),
}

/// Snapshot of a running phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerProgress {
    /// Tasks finished so far
    pub completed: usize,
    /// Tasks submitted in this phase
    pub total: usize,
    /// Bytes read since the previous snapshot
    pub bytes_read: u64,
    /// Time covered by `bytes_read`
    pub interval: Duration,
}

impl SchedulerProgress {
    /// Read throughput over the sampled interval, in bytes per second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.interval.as_secs_f64();
        if secs > 0.0 {
            self.bytes_read as f64 / secs
        } else {
            0.0
        }
    }

    /// Fraction of tasks finished, in percent.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Counting pool of "one open file" permits.
///
/// A bounded channel prefilled with tokens: receiving takes a permit, sending
/// gives it back.
#[derive(Debug, Clone)]
struct PermitPool {
    take: Receiver<()>,
    give: Sender<()>,
    #[cfg(test)]
    usage: Arc<PermitUsage>,
}

/// Permits held right now and the most ever held at once.
#[cfg(test)]
#[derive(Debug, Default)]
struct PermitUsage {
    held: AtomicUsize,
    peak: AtomicUsize,
}

impl PermitPool {
    fn new(capacity: usize) -> Self {
        let (give, take) = bounded(capacity);
        for _ in 0..capacity {
            let _ = give.send(());
        }
        Self {
            take,
            give,
            #[cfg(test)]
            usage: Arc::default(),
        }
    }

    fn acquire(&self) -> Permit {
        // The pool keeps its own sender alive, so this only returns once a
        // token is available.
        let _ = self.take.recv();
        #[cfg(test)]
        {
            let held = self.usage.held.fetch_add(1, Ordering::SeqCst) + 1;
            self.usage.peak.fetch_max(held, Ordering::SeqCst);
        }
        Permit {
            give: self.give.clone(),
            #[cfg(test)]
            usage: Arc::clone(&self.usage),
        }
    }

    #[cfg(test)]
    fn available(&self) -> usize {
        self.take.len()
    }

    #[cfg(test)]
    fn peak(&self) -> usize {
        self.usage.peak.load(Ordering::SeqCst)
    }
}

/// Held while a file is open. Dropping it releases the permit.
struct Permit {
    give: Sender<()>,
    #[cfg(test)]
    usage: Arc<PermitUsage>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        #[cfg(test)]
        self.usage.held.fetch_sub(1, Ordering::SeqCst);
        let _ = self.give.send(());
    }
}

/// What a task sends back when it finishes.
enum Outcome {
    Done(FileRecord),
    Panicked { path: PathBuf, message: String },
    Fatal(HashError),
}

/// Worker pool plus per-mode permit pools, reused across phases.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    hasher: ContentHasher,
    simple_permits: PermitPool,
    full_permits: PermitPool,
    progress_interval: Duration,
    results: Receiver<Outcome>,
    reporter: Sender<Outcome>,
    submitted: usize,
    completed: Arc<AtomicUsize>,
    bytes_read: Arc<AtomicU64>,
    last_poll: Mutex<Instant>,
}

impl Scheduler {
    /// Build the worker pool and permit pools from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::PoolBuild`] if rayon cannot start the
    /// workers.
    pub fn new(settings: &Settings) -> Result<Self, SchedulerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads)
            .thread_name(|i| format!("dupfinder-hash-{i}"))
            .build()?;

        log::debug!(
            "Scheduler: {} workers, {} simple reads, {} full reads",
            settings.worker_threads,
            settings.max_simple_reads,
            settings.max_full_reads
        );

        let (reporter, results) = unbounded();
        Ok(Self {
            pool,
            hasher: ContentHasher::from_settings(settings),
            simple_permits: PermitPool::new(settings.max_simple_reads),
            full_permits: PermitPool::new(settings.max_full_reads),
            progress_interval: settings.progress_interval(),
            results,
            reporter,
            submitted: 0,
            completed: Arc::new(AtomicUsize::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            last_poll: Mutex::new(Instant::now()),
        })
    }

    /// Spawn one `mode` hashing task per record.
    pub fn submit_all(&mut self, mode: HashMode, records: impl IntoIterator<Item = FileRecord>) {
        let permits = match mode {
            HashMode::Partial => &self.simple_permits,
            HashMode::Full => &self.full_permits,
        };

        for record in records {
            let permits = permits.clone();
            let reporter = self.reporter.clone();
            let completed = Arc::clone(&self.completed);
            let bytes_read = Arc::clone(&self.bytes_read);
            let hasher = self.hasher;

            self.pool.spawn(move || {
                let path = record.path().to_path_buf();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    hash_task(record, mode, hasher, &permits, &bytes_read)
                }))
                .unwrap_or_else(|payload| Outcome::Panicked {
                    path,
                    message: panic_message(payload.as_ref()),
                });
                completed.fetch_add(1, Ordering::Relaxed);
                let _ = reporter.send(outcome);
            });
            self.submitted += 1;
        }
    }

    /// Number of tasks submitted since the last [`await_all`](Self::await_all).
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Take a progress snapshot. Resets the byte counter.
    pub fn progress(&self) -> SchedulerProgress {
        let mut last_poll = self.last_poll.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let interval = now.duration_since(*last_poll);
        *last_poll = now;

        SchedulerProgress {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.submitted,
            bytes_read: self.bytes_read.swap(0, Ordering::Relaxed),
            interval,
        }
    }

    /// Block until every submitted task has reported and return the records.
    ///
    /// While waiting, a snapshot is passed to `progress` every progress
    /// interval. Records whose task panicked are not returned. The scheduler
    /// is ready for the next phase afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ResourceExhausted`] as soon as a task reports
    /// an out-of-memory failure.
    pub fn await_all(
        &mut self,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<Vec<FileRecord>, SchedulerError> {
        let mut records = Vec::with_capacity(self.submitted);
        let mut received = 0usize;
        let mut next_tick = Instant::now() + self.progress_interval;

        while received < self.submitted {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(timeout) {
                Ok(Outcome::Done(record)) => {
                    received += 1;
                    records.push(record);
                }
                Ok(Outcome::Panicked { path, message }) => {
                    received += 1;
                    log::error!("Task for {} failed: {}", path.display(), message);
                }
                Ok(Outcome::Fatal(error)) => {
                    log::error!("Fatal error: {}", error);
                    self.reset();
                    return Err(SchedulerError::ResourceExhausted(error));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if Instant::now() >= next_tick {
                let snapshot = self.progress();
                if let Some(callback) = progress {
                    callback.on_progress(&snapshot);
                }
                next_tick = Instant::now() + self.progress_interval;
            }
        }

        self.reset();
        Ok(records)
    }

    /// Clear per-phase bookkeeping. A fresh channel keeps stray reports from
    /// an abandoned phase out of the next one.
    fn reset(&mut self) {
        let (reporter, results) = unbounded();
        self.reporter = reporter;
        self.results = results;
        self.submitted = 0;
        self.completed.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        *self.last_poll.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.pool.current_num_threads())
            .field("hasher", &self.hasher)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

/// Hash one record in `mode`.
fn hash_task(
    mut record: FileRecord,
    mode: HashMode,
    hasher: ContentHasher,
    permits: &PermitPool,
    bytes_read: &AtomicU64,
) -> Outcome {
    if mode == HashMode::Full && record.is_fully_hashed() {
        log::trace!("Already fully hashed: {}", record.path().display());
        return Outcome::Done(record);
    }

    let pending = {
        let _permit = permits.acquire();
        hasher.read(record.path(), mode)
    };
    bytes_read.fetch_add(pending.bytes_read(), Ordering::Relaxed);

    match pending.finalize() {
        (_, Some(error)) if error.is_fatal() => Outcome::Fatal(error),
        (_, Some(error)) => {
            log::debug!("Failed {} of {}: {}", mode, record.path().display(), error);
            record.set_error(error.to_string());
            Outcome::Done(record)
        }
        (digest, None) => {
            record.apply_digest(&digest);
            Outcome::Done(record)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
