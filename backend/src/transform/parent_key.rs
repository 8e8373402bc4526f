//! The Parent Key rewrite.
//!
//! For each row the comparison column records whether `Custom field (Parent Key)`
//! already equalled `Issue key`, then the Parent Key is overwritten with the
//! Issue key. Equal keys are flagged `خیر` and differing keys `بله`: a `بله`
//! row is one the rewrite corrected.
//!
//! ```text
//! Issue key │ Parent Key          Issue key │ Parent Key │ comparison
//! ──────────┼───────────    →     ──────────┼────────────┼───────────
//! ABC-1     │ ABC-1               ABC-1     │ ABC-1      │ خیر
//! ABC-2     │ XYZ-9               ABC-2     │ ABC-2      │ بله
//! ```
//!
//! Running the rewrite again on its own output flags every row `خیر`, since
//! both keys are equal by then.

use crate::models::{ParentKeyFlag, Row, TransformedRow, COMPARISON_FIELD, ISSUE_KEY, PARENT_KEY};

/// Rewrite a single row. Other columns keep their values and positions; the
/// comparison column is appended unless the row already has one.
pub fn transform_row(row: &Row) -> TransformedRow {
    let issue_key = row.value(ISSUE_KEY).to_string();
    let flag = ParentKeyFlag::from_comparison(row.value(PARENT_KEY) == issue_key);

    let mut out = row.clone();
    out.set(COMPARISON_FIELD, flag.token());
    out.set(PARENT_KEY, issue_key);

    TransformedRow::new(out, flag)
}

/// Rewrite every row, keeping count and order.
pub fn transform_rows(rows: &[Row]) -> Vec<TransformedRow> {
    rows.iter().map(transform_row).collect()
}
