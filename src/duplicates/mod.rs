//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Signature-keyed candidate grouping shared by every phase
//! - The bounded scheduler that runs hashing tasks
//! - The three-phase pipeline (size, partial hash, full hash)

pub mod finder;
pub mod groups;
pub mod scheduler;

pub use finder::{DuplicateFinder, FinderError, ScanSummary};
pub use groups::{CandidateGroup, CandidateStore, ReductionStats};
pub use scheduler::{Scheduler, SchedulerError, SchedulerProgress};
