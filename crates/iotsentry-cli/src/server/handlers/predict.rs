//! Prediction handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use iotsentry::{ExportFormat, PredictionReport, ReportView};
use serde::{Deserialize, Serialize};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Rows returned in a preview unless the client asks for more.
const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Upper bound on preview rows.
const MAX_PREVIEW_ROWS: usize = 1000;

/// Name recorded for uploads that don't supply one.
const DEFAULT_UPLOAD_NAME: &str = "upload.csv";

/// Query parameters shared by both prediction endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    /// Original file name of the upload.
    pub name: Option<String>,
    /// Number of preview rows to return.
    pub preview: Option<usize>,
    /// Download format for `/predict/csv` (csv, tsv, json).
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub report: ReportView,
}

/// Parse and classify an upload off the async worker threads.
async fn classify(
    state: &AppState,
    name: Option<String>,
    body: Bytes,
) -> Result<PredictionReport, ApiError> {
    let sentry = state.sentry.clone();
    let name = name.unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());

    let report = tokio::task::spawn_blocking(move || sentry.predict_upload(&name, &body))
        .await
        .map_err(|e| ApiError::Internal(format!("Task failed: {}", e)))??;
    Ok(report)
}

/// Classify an uploaded table and return a preview with the label counts.
pub async fn predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let preview = params
        .preview
        .unwrap_or(DEFAULT_PREVIEW_ROWS)
        .min(MAX_PREVIEW_ROWS);

    let report = classify(&state, params.name, body).await?;

    Ok(Json(PredictResponse {
        status: "delivered",
        report: report.view(preview),
    }))
}

/// Classify an uploaded table and return the labelled table as a download.
pub async fn predict_download(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let format = match params.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::BadRequest)?,
        None => ExportFormat::Csv,
    };

    let report = classify(&state, params.name, body).await?;
    let bytes = report.table.to_bytes(format)?;
    let disposition = format!(
        "attachment; filename=\"predictions.{}\"",
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
