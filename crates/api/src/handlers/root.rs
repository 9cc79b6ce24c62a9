use axum::{extract::State, Json};
use serde::Serialize;

use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: String,
}

/// 根路径处理器
pub async fn root_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "FirstDue dispatch listener",
        version: state.service_version,
    })
}
