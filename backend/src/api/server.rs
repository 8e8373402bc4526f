//! HTTP adapter around the pipeline.
//!
//! Plays the role of the upload page: it accepts a CSV file, runs it
//! through the result slot, and serves the processed file for download.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/upload`     | Upload a Jira CSV export (field `file`)  |
//! | GET    | `/api/status`     | State of the latest run                  |
//! | GET    | `/api/download`   | Processed CSV of the latest run          |
//! | GET    | `/api/logs`       | SSE stream of run logs                   |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, log_warning, LOG_BROADCASTER};
use super::types::{error_response, StatusResponse, UploadResponse};
use crate::error::{ServerError, ServerResult};
use crate::export::serialize;
use crate::session::{RunSlot, RunState};
use crate::transform::pipeline::ProcessOptions;

type ApiError = (StatusCode, Json<Value>);

/// Shared state of the HTTP adapter
#[derive(Clone)]
pub struct AppState {
    pub slot: Arc<RunSlot>,
    pub options: ProcessOptions,
}

impl AppState {
    pub fn new(options: ProcessOptions) -> Self {
        Self {
            slot: Arc::new(RunSlot::new()),
            options,
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/status", get(status))
        .route("/api/download", get(download))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, options: ProcessOptions) -> ServerResult<()> {
    let app = router(AppState::new(options));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Parent Key server running on http://localhost:{}", port);
    println!("   POST /api/upload   - Upload Jira CSV export");
    println!("   GET  /api/status   - Latest run state");
    println!("   GET  /api/download - Processed CSV");
    println!("   GET  /api/logs     - SSE log stream");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "parentkey",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Only `.csv` files are taken, whatever their content type.
pub fn is_csv_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

/// Upload endpoint: one run per request
async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(ServerError::BadRequest(format!("Read error: {}", e))))?;
        upload = Some((name, bytes.to_vec()));
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| bad_request(ServerError::BadRequest("No file provided".into())))?;

    if !is_csv_name(&file_name) {
        return Err(bad_request(ServerError::BadRequest(format!(
            "Not a CSV file: {}",
            file_name
        ))));
    }

    log_info(format!("📄 New upload: {} ({} bytes)", file_name, bytes.len()));

    let outcome = state.slot.run(&file_name, &bytes, &state.options).await;

    if !outcome.published {
        return Err((
            StatusCode::CONFLICT,
            Json(error_response(
                Some(outcome.run_id),
                "superseded",
                "A newer upload replaced this run",
            )),
        ));
    }

    match outcome.state {
        RunState::Succeeded(result) => Ok(Json(UploadResponse::new(
            outcome.run_id,
            &result,
            state.options.preview_rows,
        ))),
        RunState::Failed { error, .. } => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(error_response(
                Some(outcome.run_id),
                error.kind(),
                &error.to_string(),
            )),
        )),
        _ => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(Some(outcome.run_id), "unknown", "Run did not finish")),
        )),
    }
}

/// State of the latest run
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::from(&state.slot.current()))
}

/// Processed CSV of the latest successful run
async fn download(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.slot.current();
    let result = snapshot.state.result().ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(error_response(
                Some(snapshot.run_id),
                "not_ready",
                "No processed file available",
            )),
        )
    })?;

    let artifact = serialize(result).map_err(|e| {
        log_error(format!("Export failed: {}", e));
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(Some(snapshot.run_id), "export", &e.to_string())),
        )
    })?;

    log_success(format!(
        "💾 Download ready: {} ({} bytes)",
        artifact.file_name,
        artifact.bytes.len()
    ));
    let headers = [
        (header::CONTENT_TYPE, artifact.mime_type.to_string()),
        (header::CONTENT_DISPOSITION, artifact.content_disposition()),
    ];
    Ok((headers, artifact.bytes).into_response())
}

fn bad_request(err: ServerError) -> ApiError {
    log_warning(err.to_string());
    (
        StatusCode::BAD_REQUEST,
        Json(error_response(None, "bad_request", &err.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_name_filter() {
        assert!(is_csv_name("export.csv"));
        assert!(is_csv_name("EXPORT.CSV"));
        assert!(!is_csv_name("export.xlsx"));
        assert!(!is_csv_name(""));
    }

    #[tokio::test]
    async fn test_download_without_result_is_not_found() {
        let state = AppState::new(ProcessOptions::immediate());
        let err = download(State(state)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_serves_latest_result() {
        let state = AppState::new(ProcessOptions::immediate());
        state
            .slot
            .run(
                "jira.csv",
                b"Issue key,Custom field (Parent Key)\nA-1,B-2",
                &state.options,
            )
            .await;

        let response = download(State(state.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"processed_jira_export.csv\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv;charset=utf-8"
        );

        let status = status(State(state)).await;
        assert_eq!(status.0.row_count, Some(1));
    }
}
