//! Domain models for the Parent Key pipeline.
//!
//! - [`Row`] - one CSV data line as an ordered column → value mapping
//! - [`RawTable`] - header row plus data rows, as parsed
//! - [`TransformedRow`] - a row after the Parent Key rewrite
//! - [`ParentKeyFlag`] - the comparison outcome written to each row
//! - [`ProcessingResult`] - outcome of one successful run
//! - [`TablePreview`] - first rows of a table, for display

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

// =============================================================================
// Column names and tokens
// =============================================================================

/// Unique identifier of a work item in the Jira export.
pub const ISSUE_KEY: &str = "Issue key";

/// Parent identifier of a work item in the Jira export.
pub const PARENT_KEY: &str = "Custom field (Parent Key)";

/// Columns that must appear in the header row, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 2] = [PARENT_KEY, ISSUE_KEY];

/// Column appended by the transform: "was Parent Key equal to Issue key?".
pub const COMPARISON_FIELD: &str = "آیا Parent Key برابر Issue key بود؟";

/// Affirmative token ("yes").
pub const YES_TOKEN: &str = "بله";

/// Negative token ("no").
pub const NO_TOKEN: &str = "خیر";

/// Number of rows shown in previews.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

// =============================================================================
// Comparison flag
// =============================================================================

/// Value of the comparison column.
///
/// `Yes` marks a row whose Parent Key differed from its Issue key, i.e. a
/// row the rewrite actually corrected. Equal keys give `No`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ParentKeyFlag {
    Yes,
    No,
}

impl ParentKeyFlag {
    /// Flag for a row whose keys were (or were not) equal before the rewrite.
    pub fn from_comparison(was_equal: bool) -> Self {
        if was_equal {
            ParentKeyFlag::No
        } else {
            ParentKeyFlag::Yes
        }
    }

    /// Token written to the CSV.
    pub fn token(self) -> &'static str {
        match self {
            ParentKeyFlag::Yes => YES_TOKEN,
            ParentKeyFlag::No => NO_TOKEN,
        }
    }

    /// Parse a token back, e.g. when reading a previously exported file.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            YES_TOKEN => Some(ParentKeyFlag::Yes),
            NO_TOKEN => Some(ParentKeyFlag::No),
            _ => None,
        }
    }
}

// =============================================================================
// Row
// =============================================================================

/// Ordered mapping from column name to value.
///
/// Backed by an insertion-ordered `serde_json::Map` holding string values.
/// Setting a column that already exists replaces its value and keeps its
/// position; a new column is appended. Duplicate header names therefore end
/// up as a single column holding the last value seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: Map<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(Value::as_str)
    }

    /// Value of `column`, empty when absent.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(column.into(), Value::String(value.into()));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(|v| v.as_str().unwrap_or(""))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str().unwrap_or("")))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Parsed CSV: header names in file order and one [`Row`] per data line.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A row after the rewrite.
///
/// `row` already holds the overwritten Parent Key and the comparison column;
/// `flag` is the typed view of that column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedRow {
    row: Row,
    flag: ParentKeyFlag,
}

impl TransformedRow {
    pub(crate) fn new(row: Row, flag: ParentKeyFlag) -> Self {
        Self { row, flag }
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn flag(&self) -> ParentKeyFlag {
        self.flag
    }

    pub fn issue_key(&self) -> &str {
        self.row.value(ISSUE_KEY)
    }

    pub fn parent_key(&self) -> &str {
        self.row.value(PARENT_KEY)
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}

impl Serialize for TransformedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.row.serialize(serializer)
    }
}

// =============================================================================
// Run result
// =============================================================================

/// Outcome of one successful run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub rows: Vec<TransformedRow>,
    pub original: RawTable,
    pub file_name: String,
}

impl ProcessingResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows whose Parent Key had to be changed.
    pub fn flagged_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.flag() == ParentKeyFlag::Yes)
            .count()
    }

    /// Key columns of the first `limit` transformed rows.
    pub fn preview(&self, limit: usize) -> TablePreview {
        let columns = [ISSUE_KEY, PARENT_KEY, COMPARISON_FIELD];
        TablePreview {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .take(limit)
                .map(|r| columns.iter().map(|c| r.row().value(c).to_string()).collect())
                .collect(),
            remaining: self.rows.len().saturating_sub(limit),
        }
    }

    /// Every column of the first `limit` original rows.
    pub fn original_preview(&self, limit: usize) -> TablePreview {
        let columns: Vec<String> = self
            .original
            .rows
            .first()
            .map(|r| r.columns().map(String::from).collect())
            .unwrap_or_default();

        TablePreview {
            rows: self
                .original
                .rows
                .iter()
                .take(limit)
                .map(|r| r.values().map(String::from).collect())
                .collect(),
            remaining: self.original.rows.len().saturating_sub(limit),
            columns,
        }
    }
}

/// First rows of a table with the number of rows left out.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub remaining: usize,
}

impl TablePreview {
    /// Plain-text rendering, one `|`-separated line per row.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.columns.join(" | "));
        for row in &self.rows {
            lines.push(row.join(" | "));
        }
        if self.remaining > 0 {
            lines.push(format!("... {} more rows", self.remaining));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(issue: &str, parent: &str) -> Row {
        [("Summary", "Fix login"), (ISSUE_KEY, issue), (PARENT_KEY, parent)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_flag_mapping_is_inverted() {
        assert_eq!(ParentKeyFlag::from_comparison(true), ParentKeyFlag::No);
        assert_eq!(ParentKeyFlag::from_comparison(false), ParentKeyFlag::Yes);
        assert_eq!(ParentKeyFlag::Yes.token(), "بله");
        assert_eq!(ParentKeyFlag::No.token(), "خیر");
        assert_eq!(ParentKeyFlag::from_token("خیر"), Some(ParentKeyFlag::No));
        assert_eq!(ParentKeyFlag::from_token("yes"), None);
    }

    #[test]
    fn test_row_set_keeps_position() {
        let mut row = sample_row("A-1", "A-0");
        row.set(PARENT_KEY, "A-1");
        row.set("Extra", "x");

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, vec!["Summary", ISSUE_KEY, PARENT_KEY, "Extra"]);
        assert_eq!(row.value(PARENT_KEY), "A-1");
        assert_eq!(row.value("Missing"), "");
        assert_eq!(row.get("Missing"), None);
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row: Row = [("b", "2"), ("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"b":"2","a":"1"}"#);
    }

    #[test]
    fn test_preview_limits_rows() {
        let rows: Vec<TransformedRow> = (0..7)
            .map(|i| {
                let key = format!("K-{}", i);
                let mut row = sample_row(&key, &key);
                row.set(COMPARISON_FIELD, NO_TOKEN);
                TransformedRow::new(row, ParentKeyFlag::No)
            })
            .collect();
        let original = RawTable {
            headers: vec!["Summary".into(), ISSUE_KEY.into(), PARENT_KEY.into()],
            rows: (0..7).map(|i| sample_row(&format!("K-{}", i), "P")).collect(),
        };
        let result = ProcessingResult {
            rows,
            original,
            file_name: "export.csv".into(),
        };

        let preview = result.preview(DEFAULT_PREVIEW_ROWS);
        assert_eq!(preview.columns, vec![ISSUE_KEY, PARENT_KEY, COMPARISON_FIELD]);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.remaining, 2);
        assert_eq!(preview.rows[0], vec!["K-0", "K-0", NO_TOKEN]);

        let original = result.original_preview(10);
        assert_eq!(original.columns.len(), 3);
        assert_eq!(original.rows.len(), 7);
        assert_eq!(original.remaining, 0);
        assert_eq!(original.rows[3][2], "P");

        assert_eq!(result.flagged_count(), 0);
        assert!(preview.render().ends_with("... 2 more rows"));
    }
}
