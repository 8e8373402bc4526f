//! High-level pipeline API: one uploaded file in, one result or error out.
//!
//! ```text
//! text ──▶ parse ──▶ validate ──▶ transform ──▶ (delay) ──▶ ProcessingResult
//!            │           │
//!            └───────────┴──────▶ ProcessingError
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use parentkey::{process_text, ProcessOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let text = "Issue key,Custom field (Parent Key)\nABC-1,ABC-1\nABC-2,XYZ-9";
//!     let result = process_text("export.csv", text, &ProcessOptions::immediate())
//!         .await
//!         .unwrap();
//!     println!("{} of {} rows corrected", result.flagged_count(), result.row_count());
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::logs::{LogEntry, LOG_BROADCASTER};
use crate::error::RunResult;
use crate::models::{ProcessingResult, DEFAULT_PREVIEW_ROWS};
use crate::parser::{decode_upload, parse_table};
use crate::transform::parent_key::transform_rows;
use crate::validation::validate_headers;

/// Default pause before a result is published.
pub const DEFAULT_DELAY_MS: u64 = 1500;

/// Environment variable overriding [`DEFAULT_DELAY_MS`].
pub const DELAY_ENV_VAR: &str = "PARENTKEY_DELAY_MS";

/// Options for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Artificial pause after the transform, before the result is returned.
    pub delay: Duration,

    /// Rows shown in previews
    pub preview_rows: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl ProcessOptions {
    /// Defaults without the artificial pause.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Defaults, with the delay taken from `PARENTKEY_DELAY_MS` when it is a
    /// valid number of milliseconds.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(ms) = std::env::var(DELAY_ENV_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            options.delay = Duration::from_millis(ms);
        }
        options
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Pipeline stage, reported as each one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parsing,
    Validating,
    Transforming,
}

/// Observer of a run.
///
/// Stage reports drive the run state machine; log entries let an observer
/// tag messages with its run before they are broadcast.
pub trait Progress {
    fn stage(&mut self, _stage: Stage) {}

    fn log(&mut self, entry: LogEntry) {
        LOG_BROADCASTER.log(entry);
    }
}

/// Observer for runs nobody tracks: logs go straight to the broadcaster.
#[derive(Debug, Default, Clone, Copy)]
pub struct Untracked;

impl Progress for Untracked {}

/// The artificial pause. Has no effect besides waiting; zero skips it.
pub async fn simulate_work(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Run the pipeline on decoded text.
///
/// Validation always runs before the transform, and any error ends the run
/// without a result.
pub async fn process_with_progress<P: Progress + ?Sized>(
    file_name: &str,
    text: &str,
    options: &ProcessOptions,
    progress: &mut P,
) -> RunResult<ProcessingResult> {
    progress.stage(Stage::Parsing);
    progress.log(LogEntry::info(format!("📖 Reading {}", file_name)));
    let table = match parse_table(text) {
        Ok(table) => table,
        Err(e) => {
            progress.log(LogEntry::error(e.to_string()));
            return Err(e.into());
        }
    };
    progress.log(LogEntry::success(format!(
        "{} columns, {} data rows",
        table.headers.len(),
        table.row_count()
    )));

    progress.stage(Stage::Validating);
    if let Err(e) = validate_headers(&table.headers) {
        progress.log(LogEntry::error(e.to_string()));
        return Err(e.into());
    }
    progress.log(LogEntry::success("Required columns present"));

    progress.stage(Stage::Transforming);
    let rows = transform_rows(&table.rows);
    simulate_work(options.delay).await;

    let result = ProcessingResult {
        rows,
        original: table,
        file_name: file_name.to_string(),
    };

    let flagged = result.flagged_count();
    if flagged > 0 {
        progress.log(LogEntry::warning(format!(
            "{} of {} rows had a different Parent Key",
            flagged,
            result.row_count()
        )));
    }
    progress.log(LogEntry::success(format!(
        "✅ Transformed {} rows",
        result.row_count()
    )));

    Ok(result)
}

/// Run the pipeline on decoded text without tracking.
pub async fn process_text(
    file_name: &str,
    text: &str,
    options: &ProcessOptions,
) -> RunResult<ProcessingResult> {
    process_with_progress(file_name, text, options, &mut Untracked).await
}

/// Decode raw upload bytes (lossily), then run the pipeline.
pub async fn process_bytes(
    file_name: &str,
    bytes: &[u8],
    options: &ProcessOptions,
) -> RunResult<ProcessingResult> {
    let text = decode_upload(bytes);
    process_text(file_name, &text, options).await
}

/// Read a file from disk, then run the pipeline. The file name recorded in
/// the result is the path's final component.
pub async fn process_file(
    path: &Path,
    options: &ProcessOptions,
) -> RunResult<ProcessingResult> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.csv");
    process_bytes(file_name, &bytes, options).await
}
