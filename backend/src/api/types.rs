//! REST API payloads.
//!
//! Field names are camelCase for the browser client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{ProcessingResult, TablePreview};
use crate::session::{RunId, RunPhase, RunSnapshot};

/// Response to a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub run_id: RunId,

    /// Always "ready" for this payload
    pub status: String,

    /// Name of the uploaded file
    pub file_name: String,

    /// Number of transformed rows
    pub row_count: usize,

    /// Rows whose Parent Key differed from the Issue key
    pub flagged_count: usize,

    /// Key columns of the first transformed rows
    pub preview: TablePreview,

    /// All columns of the first original rows
    pub original_preview: TablePreview,

    /// Where to fetch the processed CSV
    pub download_url: String,
}

impl UploadResponse {
    pub fn new(run_id: RunId, result: &ProcessingResult, preview_rows: usize) -> Self {
        Self {
            run_id,
            status: "ready".to_string(),
            file_name: result.file_name.clone(),
            row_count: result.row_count(),
            flagged_count: result.flagged_count(),
            preview: result.preview(preview_rows),
            original_preview: result.original_preview(preview_rows),
            download_url: "/api/download".to_string(),
        }
    }
}

/// Current state of the result slot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub run_id: RunId,
    pub state: RunPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: String,
}

impl From<&RunSnapshot> for StatusResponse {
    fn from(snap: &RunSnapshot) -> Self {
        Self {
            run_id: snap.run_id,
            state: snap.state.phase(),
            file_name: snap.state.file_name().map(String::from),
            row_count: snap.state.result().map(|r| r.row_count()),
            error: snap.state.error().map(|e| e.to_string()),
            updated_at: snap.updated_at.clone(),
        }
    }
}

/// Create an error response
pub fn error_response(run_id: Option<RunId>, kind: &str, error: &str) -> Value {
    json!({
        "runId": run_id,
        "status": "error",
        "kind": kind,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::models::{RawTable, COMPARISON_FIELD};
    use crate::parser::parse_table;
    use crate::session::RunState;
    use crate::transform::transform_rows;
    use std::sync::Arc;

    fn result() -> ProcessingResult {
        let original: RawTable =
            parse_table("Issue key,Custom field (Parent Key)\nA-1,A-1\nA-2,B-7").unwrap();
        ProcessingResult {
            rows: transform_rows(&original.rows),
            original,
            file_name: "export.csv".into(),
        }
    }

    #[test]
    fn test_upload_response_shape() {
        let response = UploadResponse::new(3, &result(), 5);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["runId"], 3);
        assert_eq!(json["status"], "ready");
        assert_eq!(json["rowCount"], 2);
        assert_eq!(json["flaggedCount"], 1);
        assert_eq!(json["preview"]["columns"][2], COMPARISON_FIELD);
        assert_eq!(json["preview"]["rows"][1][2], "بله");
        assert_eq!(json["originalPreview"]["rows"][1][1], "B-7");
        assert_eq!(json["originalPreview"]["remaining"], 0);
    }

    #[test]
    fn test_status_for_success_and_failure() {
        let ok = RunSnapshot {
            run_id: 4,
            state: RunState::Succeeded(Arc::new(result())),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(StatusResponse::from(&ok)).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["rowCount"], 2);
        assert!(json.get("error").is_none());

        let failed = RunSnapshot {
            run_id: 5,
            state: RunState::Failed {
                file_name: "bad.csv".into(),
                error: ProcessingError::unknown("boom"),
            },
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(StatusResponse::from(&failed)).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["fileName"], "bad.csv");
        assert!(json["error"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn test_error_response() {
        let json = error_response(Some(2), "parse", "too short");
        assert_eq!(json["status"], "error");
        assert_eq!(json["runId"], 2);
        assert_eq!(json["kind"], "parse");
    }
}
