//! Line-based CSV parser for Jira exports.
//!
//! Deliberately simple: lines are split on `\n`, fields on `,`, and quote
//! characters are removed rather than interpreted. A quoted field that
//! contains a comma is therefore split in two. Files produced by the tool
//! itself parse back to the same values.

use crate::error::{ParseError, ParseResult};
use crate::models::{RawTable, Row};

/// Field separator.
pub const DELIMITER: char = ',';

/// Decode an uploaded file to text.
///
/// UTF-8 only. A leading byte-order mark is dropped and invalid byte
/// sequences become U+FFFD, so a stray Latin-1 byte never fails a run.
pub fn decode_upload(bytes: &[u8]) -> String {
    let (text, _had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    text.into_owned()
}

fn is_trimmed(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Trim whitespace and byte-order marks from both ends.
pub fn trim_field(raw: &str) -> &str {
    raw.trim_matches(is_trimmed)
}

/// Trim surrounding whitespace, then remove every `"`.
pub fn clean_field(raw: &str) -> String {
    trim_field(raw).replace('"', "")
}

/// Split one line into cleaned fields.
pub fn split_line(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(clean_field).collect()
}

/// Parse CSV text into a header list and rows.
///
/// Blank lines are dropped everywhere. At least one header line and one
/// data line must remain. Short rows are padded with empty values and extra
/// fields are ignored.
///
/// # Example
/// ```ignore
/// use parentkey::parse_table;
///
/// let table = parse_table("Issue key,Summary\nABC-1,Login").unwrap();
/// assert_eq!(table.headers, vec!["Issue key", "Summary"]);
/// assert_eq!(table.rows[0].value("Summary"), "Login");
/// ```
pub fn parse_table(text: &str) -> ParseResult<RawTable> {
    let lines: Vec<&str> = text
        .split('\n')
        .filter(|line| !trim_field(line).is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(ParseError::TooFewLines { found: lines.len() });
    }

    let headers = split_line(lines[0]);

    let rows = lines[1..]
        .iter()
        .map(|line| {
            let values = split_line(line);
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = values.get(i).map(String::as_str).unwrap_or("");
                    (header.as_str(), value)
                })
                .collect::<Row>()
        })
        .collect();

    Ok(RawTable { headers, rows })
}
