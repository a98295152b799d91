//! Report formatters for the terminal candidate store.
//!
//! - [`text`]: the human-readable report, groups sorted by file size
//! - [`json`]: a JSON document for automation and scripting
//! - [`csv`]: one row per duplicate file for spreadsheet import
//!
//! All formatters list groups in the same order: ascending size per file, so
//! the largest duplicates end up last, closest to the summary.
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::config::Settings;
//! use dupfinder::duplicates::DuplicateFinder;
//! use dupfinder::output::TextOutput;
//! use std::path::PathBuf;
//!
//! let mut finder = DuplicateFinder::new(Settings::default()).unwrap();
//! let (store, summary) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! TextOutput::new(&store, &summary, true)
//!     .write_to(&mut std::io::stdout())
//!     .unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;

use crate::duplicates::{CandidateGroup, CandidateStore};

/// Groups ordered by size per file, then signature.
pub(crate) fn sorted_groups(store: &CandidateStore) -> Vec<(&str, &CandidateGroup)> {
    let mut groups: Vec<_> = store.groups().collect();
    groups.sort_by(|(sig_a, a), (sig_b, b)| {
        a.size_per_file()
            .cmp(&b.size_per_file())
            .then_with(|| sig_a.cmp(sig_b))
    });
    groups
}
