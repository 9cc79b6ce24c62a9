use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Deployment environment, read from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(env: &str) -> Result<Self, Self::Err> {
        match env.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" | "testing" => Ok(Environment::Test),
            _ => Err(ConfigError::Environment(format!(
                "Invalid environment: {env}. Valid values: development, production, test"
            ))),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The conventional unprefixed variables the deployment sets. They win over
/// both the config file and `LISTENER__*` variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub port: Option<String>,
    pub node_env: Option<String>,
    pub log_level: Option<String>,
    pub timezone: Option<String>,
    pub firstdue_api_key: Option<String>,
    pub firstdue_base_url: Option<String>,
    pub convex_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            port: get("PORT"),
            node_env: get("NODE_ENV"),
            log_level: get("LOG_LEVEL"),
            timezone: get("TZ"),
            firstdue_api_key: get("FIRSTDUE_API_KEY"),
            firstdue_base_url: get("FIRSTDUE_BASE_URL"),
            convex_url: get("CONVEX_URL"),
        }
    }

    pub(crate) fn apply(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let port = match &self.port {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::Environment(format!("PORT must be a valid port number, got {raw}"))
            })?),
            None => None,
        };
        let environment = match &self.node_env {
            Some(raw) => Some(raw.parse::<Environment>()?.as_str()),
            None => None,
        };

        let log_level = match &self.log_level {
            Some(raw) => Some(
                raw.parse::<crate::LogLevel>()
                    .map_err(ConfigError::Environment)?
                    .to_string(),
            ),
            None => None,
        };

        let builder = builder
            .set_override_option("api.port", port.map(i64::from))?
            .set_override_option("environment", environment)?
            .set_override_option("observability.log_level", log_level)?
            .set_override_option("timezone", self.timezone.clone())?
            .set_override_option("firstdue.api_key", self.firstdue_api_key.clone())?
            .set_override_option("firstdue.base_url", self.firstdue_base_url.clone())?
            .set_override_option("store.convex_url", self.convex_url.clone())?;
        Ok(builder)
    }
}
