//! # Parentkey - Parent Key repair for Jira CSV exports
//!
//! Parentkey takes a CSV exported from Jira, overwrites the
//! `Custom field (Parent Key)` column with each row's `Issue key`, and adds a
//! column telling whether the two differed before the rewrite.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Jira CSV   │────▶│   Parser    │────▶│  Validator  │────▶│  Transform  │────▶│  CSV export │
//! │   (UTF-8)   │     │ (line/comma)│     │ (2 columns) │     │ (Parent Key)│     │  (BOM, "")  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parentkey::{process_file, serialize, ProcessOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = process_file("export.csv".as_ref(), &ProcessOptions::immediate())
//!         .await
//!         .unwrap();
//!     let artifact = serialize(&result).unwrap();
//!     std::fs::write(artifact.file_name, artifact.bytes).unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Rows, tables, results, previews
//! - [`parser`] - Text decoding and line-based CSV parsing
//! - [`validation`] - Required column check
//! - [`transform`] - Parent Key rewrite and the pipeline
//! - [`export`] - CSV serialization for download
//! - [`session`] - Run state machine and the single result slot
//! - [`api`] - HTTP adapter and log stream

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Export
pub mod export;

// Runs
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ExportError, ParseError, ProcessingError, ServerError, ValidationError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    ParentKeyFlag,
    ProcessingResult,
    RawTable,
    Row,
    TablePreview,
    TransformedRow,
    COMPARISON_FIELD,
    ISSUE_KEY,
    NO_TOKEN,
    PARENT_KEY,
    REQUIRED_COLUMNS,
    YES_TOKEN,
};

// =============================================================================
// Re-exports - Parsing and validation
// =============================================================================

pub use parser::{clean_field, decode_upload, parse_table, split_line, trim_field};
pub use validation::{has_required_columns, missing_columns, validate_headers};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{transform_row, transform_rows};
pub use transform::pipeline::{
    process_bytes,
    process_file,
    process_text,
    process_with_progress,
    simulate_work,
    ProcessOptions,
    Progress,
    Stage,
};

// =============================================================================
// Re-exports - Export and runs
// =============================================================================

pub use export::{serialize, serialize_rows, DownloadArtifact, DOWNLOAD_FILE_NAME};
pub use session::{RunId, RunOutcome, RunPhase, RunSlot, RunSnapshot, RunState};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
