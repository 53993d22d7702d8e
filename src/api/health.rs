use axum::{extract::State, Json};
use serde::Serialize;

use crate::controller::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    sessions: usize,
}

/// GET /healthz - liveness check
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        sessions: state.registry.session_count(),
    })
}
