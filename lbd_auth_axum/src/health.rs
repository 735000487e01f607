use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde::Serialize;

use super::config::LBD_ENVIRONMENT;
use super::session::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub environment: String,
}

pub(super) fn router() -> Router<ApiState> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        environment: LBD_ENVIRONMENT.clone(),
    })
}
