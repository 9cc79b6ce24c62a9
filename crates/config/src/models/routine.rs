use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutineConfig {
    pub name: String,
    pub poll_interval_seconds: u64,
    pub lookback_seconds: u64,
    pub unhealthy_failure_threshold: u32,
    pub shutdown_timeout_seconds: u64,
}

impl RoutineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_seconds)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow::anyhow!("Routine name must not be empty"));
        }
        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("Poll interval must be greater than 0"));
        }
        if self.unhealthy_failure_threshold == 0 {
            return Err(anyhow::anyhow!(
                "Unhealthy failure threshold must be greater than 0"
            ));
        }
        if self.shutdown_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Shutdown timeout must be greater than 0"));
        }
        Ok(())
    }
}
