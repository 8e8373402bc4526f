//! Header validation.
//!
//! A Jira export is usable only when both `Issue key` and `Custom field (Parent Key)`
//! appear in its header row. Matching is exact and case-sensitive. The check
//! runs before any row is transformed, so an invalid file never yields
//! partial output.

use crate::error::ValidationError;
use crate::models::REQUIRED_COLUMNS;

/// Required columns absent from `headers`, in reporting order.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|required| required.to_string())
        .collect()
}

/// Fail with every missing required column.
pub fn validate_headers(headers: &[String]) -> Result<(), ValidationError> {
    let missing = missing_columns(headers);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns(missing))
    }
}

/// Quick check: true/false only.
pub fn has_required_columns(headers: &[String]) -> bool {
    missing_columns(headers).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_present() {
        let h = headers(&["Summary", "Issue key", "Custom field (Parent Key)"]);
        assert!(validate_headers(&h).is_ok());
        assert!(has_required_columns(&h));
    }

    #[test]
    fn test_only_issue_key() {
        let err = validate_headers(&headers(&["Issue key"])).unwrap_err();
        assert_eq!(err.missing(), ["Custom field (Parent Key)"]);
    }

    #[test]
    fn test_reports_every_missing_column() {
        let err = validate_headers(&headers(&["Summary"])).unwrap_err();
        assert_eq!(err.missing(), ["Custom field (Parent Key)", "Issue key"]);
    }

    #[test]
    fn test_case_sensitive() {
        let h = headers(&["issue key", "Custom field (parent key)"]);
        assert_eq!(missing_columns(&h).len(), 2);
        assert!(!has_required_columns(&h));
    }
}
