use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let status = state.routine.get_status();
    let threshold = state.unhealthy_failure_threshold;

    let reason = if !status.running {
        Some("poll routine is not running".to_string())
    } else if status.consecutive_failures >= threshold {
        Some(format!(
            "{} consecutive poll failures (threshold {})",
            status.consecutive_failures, threshold
        ))
    } else {
        None
    };

    match reason {
        None => (
            StatusCode::OK,
            Json(json!({
                "ready": true,
                "routine": state.routine.name(),
                "consecutiveFailures": status.consecutive_failures,
            })),
        ),
        Some(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ready": false,
                "routine": state.routine.name(),
                "reason": reason,
                "lastError": status.last_error,
            })),
        ),
    }
}
