pub mod metrics_collector;
pub mod telemetry_setup;

pub use metrics_collector::MetricsCollector;
pub use metrics_exporter_prometheus::PrometheusHandle;
pub use telemetry_setup::{init_logging, init_metrics};
