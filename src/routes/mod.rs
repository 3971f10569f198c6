pub mod auth;
pub mod reports;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/save", post(responses::save))
        .route("/chart-data", get(reports::chart_data))
        .route("/download-export", get(reports::download_export))
        .route("/ping", get(ping))
}

async fn ping() -> &'static str {
    "pong"
}
