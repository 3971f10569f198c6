use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::AggregateResult;
use crate::report;
use crate::state::SharedState;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

pub async fn chart_data(
    State(state): State<SharedState>,
) -> Result<Json<AggregateResult>, AppError> {
    let records = state.responses.list_all().await?;
    Ok(Json(report::aggregate(&records)))
}

pub async fn download_export(
    State(state): State<SharedState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let records = state.responses.list_all().await?;
    let table = report::materialize(&records)
        .ok_or_else(|| AppError::NotFound("no data".to_string()))?;

    tracing::info!(
        "Exporting {} responses across {} questions",
        table.rows.len(),
        table.questions.len()
    );

    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    match params.format.as_deref().unwrap_or("xlsx") {
        "json" => Ok(Json(table.to_json()).into_response()),
        "csv" => Ok(attachment(
            "text/csv; charset=utf-8",
            format!("survey_responses_{stamp}.csv"),
            table.to_csv().into_bytes(),
        )),
        _ => {
            let workbook = table
                .to_xlsx()
                .map_err(|e| AppError::Internal(format!("Failed to build workbook: {e}")))?;
            Ok(attachment(
                XLSX_CONTENT_TYPE,
                format!("survey_responses_{stamp}.xlsx"),
                workbook,
            ))
        }
    }
}

fn attachment(content_type: &'static str, filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
