use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub admin_api_enabled: bool,
    pub mode: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;

    Json(HealthResponse {
        status: "ok",
        admin_api_enabled: pipeline.authority().is_admin_api_enabled(),
        mode: pipeline.store().backend_kind().as_str(),
    })
}
