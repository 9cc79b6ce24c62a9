//! # Listener API
//!
//! Read-only HTTP surface over a running `DispatchPollRoutine`.
//!
//! ## 端点
//!
//! - `GET /health` - liveness, always 200 with the routine status
//! - `GET /ready` - 503 when the routine is stopped or failing repeatedly
//! - `GET /metrics` - Prometheus exposition, when a recorder is installed
//! - `GET /`, `GET /api/` - service info
//!
//! ```rust,ignore
//! let state = AppState::new(routine, config.routine.unhealthy_failure_threshold);
//! let app = listener_api::create_app(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

use middleware::{cors_layer, request_logging, trace_layer};
pub use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(state: AppState) -> Router {
    let request_timeout = state.request_timeout;
    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(TimeoutLayer::new(request_timeout))
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
