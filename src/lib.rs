//! dupfinder - duplicate file finder
//!
//! Finds files with identical content by refining candidates in three
//! phases: file size, a BLAKE3 hash of each file's first bytes, and a BLAKE3
//! hash of the whole file. Hashing runs on a bounded worker pool that caps the
//! number of files open at once.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Settings;
use crate::duplicates::{CandidateStore, DuplicateFinder, ScanSummary};
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::{LogProgress, Progress, ProgressCallback};

/// Run the application logic for a parsed command line.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, the finder cannot start,
/// hashing hits a fatal error, or the report cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply_to(&mut settings);
    log::debug!("Settings: {:?}", settings);

    let mut finder = DuplicateFinder::new(settings.clone())?;
    if let Some(callback) = progress_callback(&settings) {
        finder = finder.with_progress_callback(callback);
    }

    let (store, summary) = finder.find_duplicates(&cli.paths)?;
    let exit_code = exit_code_for(&store, &summary);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        OutputFormat::Text => TextOutput::new(&store, &summary, settings.quote_paths)
            .write_to(&mut out)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(&store, &summary, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON report")?,
        OutputFormat::Csv => CsvOutput::new(&store)
            .write_to(&mut out)
            .context("Failed to write CSV report")?,
    }
    out.flush()?;

    Ok(exit_code)
}

/// Indicatif bars on a terminal, log lines otherwise, nothing when disabled.
fn progress_callback(settings: &Settings) -> Option<Arc<dyn ProgressCallback>> {
    if !settings.show_progress {
        None
    } else if io::stderr().is_terminal() {
        Some(Arc::new(Progress::new(false)))
    } else {
        Some(Arc::new(LogProgress::new()))
    }
}

/// Exit code for a finished scan.
#[must_use]
pub fn exit_code_for(store: &CandidateStore, summary: &ScanSummary) -> ExitCode {
    if store.is_empty() {
        ExitCode::NoDuplicates
    } else if summary.has_errors() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}
