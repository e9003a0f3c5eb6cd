use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use remedia_core::Config;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

pub async fn metrics() -> String {
    crate::metrics::encode_metrics()
}
