use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{intake, parser};

pub async fn save(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let raw = parser::parse_body(content_type, &body).map_err(AppError::BadRequest)?;
    let response = intake::normalize(raw).map_err(AppError::BadRequest)?;

    let record = state.responses.append(&response).await?;
    tracing::info!(
        "Stored response {} with {} answers",
        record.id,
        record.answers.len()
    );

    Ok(Json(json!({
        "message": "Survey saved",
        "id": record.id,
    })))
}
