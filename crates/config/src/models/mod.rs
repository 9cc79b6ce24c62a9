pub mod api_observability;
pub mod app_config;
pub mod firstdue;
pub mod logging;
pub mod routine;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use firstdue::{FirstDueConfig, StoreConfig};
pub use logging::{LogLevel, OutputFormat};
pub use routine::RoutineConfig;
