use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {path}")]
    NotFound { path: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::NotFound { path } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Not Found", "path": path }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
