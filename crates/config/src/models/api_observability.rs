use serde::{Deserialize, Serialize};

use super::logging::{LogLevel, OutputFormat};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_host.trim().is_empty() {
            return Err(anyhow::anyhow!("API bind host must not be empty"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("API request timeout must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: LogLevel,
    /// Falls back to json in production and pretty elsewhere when unset.
    #[serde(default)]
    pub log_format: Option<OutputFormat>,
    pub metrics_enabled: bool,
}
