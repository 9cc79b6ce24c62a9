use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use listener_domain::RoutineStatus;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub routine: RoutineStatus,
}

/// Liveness. Always 200; `/ready` is the endpoint that reflects failures.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        routine: state.routine.get_status(),
    })
}
