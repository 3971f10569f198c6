use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResponse {
    fn failed(status: StatusCode, message: &str) -> (StatusCode, Json<LoginResponse>) {
        (
            status,
            Json(LoginResponse {
                success: false,
                message: Some(message.to_string()),
            }),
        )
    }
}

/// Check credentials against the provisioned credential store.
/// Wrong credentials are a normal 401 answer, not an error.
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    if let Err(retry_after) = state.login_limiter.check(&req.user) {
        tracing::warn!("Login for '{}' blocked for {retry_after}s", req.user);
        return Ok(LoginResponse::failed(
            StatusCode::TOO_MANY_REQUESTS,
            &format!("Too many failed attempts. Try again in {retry_after} seconds"),
        ));
    }

    let valid = match state.credentials.password_hash(&req.user).await? {
        Some(stored) => password::verify(&req.password, &stored).map_err(AppError::Internal)?,
        None => false,
    };

    if !valid {
        state.login_limiter.record_failure(&req.user);
        tracing::info!("Failed login for '{}'", req.user);
        return Ok(LoginResponse::failed(
            StatusCode::UNAUTHORIZED,
            "Invalid credentials",
        ));
    }

    state.login_limiter.record_success(&req.user);
    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            message: None,
        }),
    ))
}
