use axum::{routing::get, Router};
use listener_dispatcher::DispatchPollRoutine;
use listener_observability::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

use crate::handlers::{
    health::health_check,
    metrics::prometheus_metrics,
    not_found::not_found,
    ready::readiness_check,
    root::root_handler,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub routine: Arc<DispatchPollRoutine>,
    /// `/ready` reports 503 once consecutive failures reach this value.
    pub unhealthy_failure_threshold: u32,
    pub metrics: Option<PrometheusHandle>,
    pub request_timeout: Duration,
    /// Reported by `/`; the binary passes its own package version.
    pub service_version: String,
}

impl AppState {
    pub fn new(routine: Arc<DispatchPollRoutine>, unhealthy_failure_threshold: u32) -> Self {
        Self {
            routine,
            unhealthy_failure_threshold,
            metrics: None,
            request_timeout: Duration::from_secs(10),
            service_version: "unknown".to_string(),
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 服务信息
        .route("/", get(root_handler))
        .route("/api", get(root_handler))
        .route("/api/", get(root_handler))
        // 健康检查
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // 监控
        .route("/metrics", get(prometheus_metrics))
        .fallback(not_found)
        .with_state(state)
}
