pub mod environment;
pub mod models;

// Re-export commonly used types
pub use environment::{EnvOverrides, Environment};
pub use models::{
    ApiConfig, AppConfig, FirstDueConfig, LogLevel, ObservabilityConfig, OutputFormat,
    RoutineConfig, StoreConfig,
};

/// Configuration error enumeration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests;
