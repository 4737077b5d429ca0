use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::models::{AppState, DiagnosisReport, ReportSummary};
use crate::report::{download_filename, render_markdown};
use crate::types::AppResult;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/reports", get(list_reports))
        .route("/api/reports/{id}", get(get_report))
        .route("/api/reports/{id}/download", get(download_report))
        .with_state(state)
}

async fn list_reports(State(state): State<AppState>) -> Json<Vec<ReportSummary>> {
    Json(state.pipeline.reports().list().await)
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DiagnosisReport>> {
    let report = state.pipeline.reports().get(id).await?;
    Ok(Json(report))
}

async fn download_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let report = state.pipeline.reports().get(id).await?;
    let filename = download_filename(&report);
    info!(report_id = %id, filename = %filename, "Report download");

    let headers = [
        (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, render_markdown(&report)))
}
