//! Error types for the Parent Key pipeline.
//!
//! The hierarchy follows the pipeline stages:
//!
//! - [`ParseError`] - not enough content to build a table
//! - [`ValidationError`] - required columns absent from the header row
//! - [`ExportError`] - nothing to serialize
//! - [`ProcessingError`] - top-level error of one run
//! - [`ServerError`] - HTTP adapter errors
//!
//! Stage errors convert into [`ProcessingError`] through `From`, so `?`
//! works across stage boundaries. Messages are the ones shown to users of
//! the tool, hence Persian.

use thiserror::Error;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Errors while turning text into a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fewer than two non-blank lines (no header, or header without data).
    #[error("فایل باید حداقل یک سطر هدر و یک سطر داده داشته باشد")]
    TooFewLines { found: usize },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors while checking the header row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Every required column that is absent, in reporting order.
    #[error("ستون‌های مورد نیاز در فایل پیدا نشدند: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl ValidationError {
    /// Names of the missing columns.
    pub fn missing(&self) -> &[String] {
        match self {
            ValidationError::MissingColumns(cols) => cols,
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while producing the downloadable CSV.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// No transformed rows, so there is no header row to write.
    #[error("no rows to export")]
    NoRows,
}

// =============================================================================
// Processing Errors (top-level)
// =============================================================================

/// Error of one pipeline run.
///
/// Terminal for the run: no partial result ever accompanies it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Anything else, e.g. a file that cannot be read or decoded.
    #[error("خطا در پردازش فایل: {0}")]
    Unknown(String),
}

impl ProcessingError {
    pub fn unknown(message: impl Into<String>) -> Self {
        ProcessingError::Unknown(message.into())
    }

    /// Short machine-readable kind, used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Parse(_) => "parse",
            ProcessingError::Validation(_) => "validation",
            ProcessingError::Unknown(_) => "unknown",
        }
    }
}

impl From<std::io::Error> for ProcessingError {
    fn from(err: std::io::Error) -> Self {
        ProcessingError::Unknown(err.to_string())
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP adapter errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Socket or runtime failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for a pipeline run.
pub type RunResult<T> = Result<T, ProcessingError>;

/// Result type for the HTTP adapter.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let err: ProcessingError = ParseError::TooFewLines { found: 1 }.into();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("حداقل"));

        let err: ProcessingError =
            ValidationError::MissingColumns(vec!["Issue key".into()]).into();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("Issue key"));
    }

    #[test]
    fn test_missing_columns_joined() {
        let err = ValidationError::MissingColumns(vec![
            "Custom field (Parent Key)".into(),
            "Issue key".into(),
        ]);
        assert!(err
            .to_string()
            .ends_with("Custom field (Parent Key), Issue key"));
        assert_eq!(err.missing().len(), 2);
    }

    #[test]
    fn test_io_error_is_unknown() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ProcessingError = io.into();
        assert_eq!(err.kind(), "unknown");
        assert!(err.to_string().contains("gone"));
    }
}
