use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment as EnvSource, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    firstdue::{FirstDueConfig, StoreConfig},
    logging::{LogLevel, OutputFormat},
    routine::RoutineConfig,
};
use crate::environment::{EnvOverrides, Environment};

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub timezone: String,
    pub api: ApiConfig,
    pub firstdue: FirstDueConfig,
    pub store: StoreConfig,
    pub routine: RoutineConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            timezone: "UTC".to_string(),
            api: ApiConfig {
                bind_host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_seconds: 10,
            },
            firstdue: FirstDueConfig {
                base_url: String::new(),
                api_key: String::new(),
                request_timeout_seconds: 15,
                page_size: 100,
                max_pages: 10,
            },
            store: StoreConfig {
                convex_url: String::new(),
                exists_function: "dispatches:existsByDispatchId".to_string(),
                insert_function: "dispatches:insert".to_string(),
                latest_function: "dispatches:latestOccurredAt".to_string(),
            },
            routine: RoutineConfig {
                name: "firstdue-dispatch".to_string(),
                poll_interval_seconds: 30,
                lookback_seconds: 120,
                unhealthy_failure_threshold: 5,
                shutdown_timeout_seconds: 30,
            },
            observability: ObservabilityConfig {
                log_level: LogLevel::Info,
                log_format: None,
                metrics_enabled: true,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment and an optional file.
    ///
    /// Load order:
    /// 1. Built-in defaults
    /// 2. Config file (TOML format), when a path is given
    /// 3. `LISTENER__SECTION__KEY` environment variables
    /// 4. Conventional variables (`PORT`, `NODE_ENV`, `LOG_LEVEL`, `TZ`,
    ///    `FIRSTDUE_API_KEY`, `FIRSTDUE_BASE_URL`, `CONVEX_URL`)
    ///
    /// Missing provider or store credentials fail validation; the caller is
    /// expected to refuse to start.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with_overrides(config_path, &EnvOverrides::from_env())
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        overrides: &EnvOverrides,
    ) -> Result<Self> {
        let mut builder = Self::with_defaults(ConfigBuilder::builder())?;

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("Config file not found: {path}"));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            EnvSource::with_prefix("LISTENER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder = overrides.apply(builder)?;

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = AppConfig::default();
        let builder = builder
            .set_default("environment", defaults.environment.as_str())?
            .set_default("timezone", defaults.timezone)?
            .set_default("api.bind_host", defaults.api.bind_host)?
            .set_default("api.port", i64::from(defaults.api.port))?
            .set_default("api.request_timeout_seconds", defaults.api.request_timeout_seconds)?
            .set_default("firstdue.base_url", defaults.firstdue.base_url)?
            .set_default("firstdue.api_key", defaults.firstdue.api_key)?
            .set_default(
                "firstdue.request_timeout_seconds",
                defaults.firstdue.request_timeout_seconds,
            )?
            .set_default("firstdue.page_size", defaults.firstdue.page_size)?
            .set_default("firstdue.max_pages", defaults.firstdue.max_pages)?
            .set_default("store.convex_url", defaults.store.convex_url)?
            .set_default("store.exists_function", defaults.store.exists_function)?
            .set_default("store.insert_function", defaults.store.insert_function)?
            .set_default("store.latest_function", defaults.store.latest_function)?
            .set_default("routine.name", defaults.routine.name)?
            .set_default(
                "routine.poll_interval_seconds",
                defaults.routine.poll_interval_seconds,
            )?
            .set_default("routine.lookback_seconds", defaults.routine.lookback_seconds)?
            .set_default(
                "routine.unhealthy_failure_threshold",
                defaults.routine.unhealthy_failure_threshold,
            )?
            .set_default(
                "routine.shutdown_timeout_seconds",
                defaults.routine.shutdown_timeout_seconds,
            )?
            .set_default(
                "observability.log_level",
                defaults.observability.log_level.to_string(),
            )?
            .set_default(
                "observability.metrics_enabled",
                defaults.observability.metrics_enabled,
            )?;
        Ok(builder)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(toml_str).context("Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    pub fn log_format(&self) -> OutputFormat {
        self.observability.log_format.unwrap_or(if self.environment.is_production() {
            OutputFormat::Json
        } else {
            OutputFormat::Pretty
        })
    }

    pub fn parsed_timezone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {e}", self.timezone))
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.parsed_timezone()?;
        self.api.validate().context("API configuration is invalid")?;
        self.firstdue
            .validate()
            .context("FirstDue configuration is invalid")?;
        self.store.validate().context("Event store configuration is invalid")?;
        self.routine
            .validate()
            .context("Routine configuration is invalid")?;
        Ok(())
    }
}
