//! CSV export of transformed rows.
//!
//! Output layout:
//!
//! - a UTF-8 byte-order mark, so spreadsheet tools pick the right encoding
//! - the header line: column names of the first row, joined with `,`
//! - one line per row, every value wrapped in `"`, lines joined with `\n`
//!
//! Values are not escaped. The parser strips every `"` on the way in, so
//! no value that reaches this module can contain one.

use crate::error::ExportError;
use crate::models::{ProcessingResult, TransformedRow};

/// Name offered for the download, whatever the uploaded file was called.
pub const DOWNLOAD_FILE_NAME: &str = "processed_jira_export.csv";

/// Content type of the download.
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";

/// Byte-order mark prepended to the output.
pub const BOM: char = '\u{feff}';

/// A file ready to hand to a save/download mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub bytes: Vec<u8>,
    pub file_name: &'static str,
    pub mime_type: &'static str,
}

impl DownloadArtifact {
    /// `Content-Disposition` value for HTTP responses.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// Serialize rows to CSV text, BOM included.
pub fn serialize_rows(rows: &[TransformedRow]) -> Result<String, ExportError> {
    let first = rows.first().ok_or(ExportError::NoRows)?;
    let headers: Vec<&str> = first.row().columns().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        let line = headers
            .iter()
            .map(|h| format!("\"{}\"", row.row().value(h)))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    let mut out = String::from(BOM);
    out.push_str(&lines.join("\n"));
    Ok(out)
}

/// Build the download artifact for a finished run.
pub fn serialize(result: &ProcessingResult) -> Result<DownloadArtifact, ExportError> {
    Ok(DownloadArtifact {
        bytes: serialize_rows(&result.rows)?.into_bytes(),
        file_name: DOWNLOAD_FILE_NAME,
        mime_type: CSV_MIME_TYPE,
    })
}
