use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Serialize, Deserialize)]
pub struct FirstDueConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_seconds: u64,
    pub page_size: u32,
    pub max_pages: u32,
}

impl std::fmt::Debug for FirstDueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirstDueConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

impl FirstDueConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Budget for one paginated fetch: every page may take the full
    /// request timeout.
    pub fn fetch_timeout(&self) -> Duration {
        self.request_timeout() * self.max_pages.max(1)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("FIRSTDUE_API_KEY is required"));
        }
        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("FIRSTDUE_BASE_URL is required"));
        }
        validate_http_url(&self.base_url, "FIRSTDUE_BASE_URL")?;
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("FirstDue request timeout must be greater than 0"));
        }
        if self.page_size == 0 {
            return Err(anyhow::anyhow!("FirstDue page size must be greater than 0"));
        }
        if self.max_pages == 0 {
            return Err(anyhow::anyhow!("FirstDue max pages must be greater than 0"));
        }
        Ok(())
    }
}

/// Convex deployment holding the dispatch table, plus the function paths
/// the listener calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub convex_url: String,
    pub exists_function: String,
    pub insert_function: String,
    pub latest_function: String,
}

impl StoreConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.convex_url.trim().is_empty() {
            return Err(anyhow::anyhow!("CONVEX_URL is required"));
        }
        validate_http_url(&self.convex_url, "CONVEX_URL")?;
        for (name, path) in [
            ("exists_function", &self.exists_function),
            ("insert_function", &self.insert_function),
            ("latest_function", &self.latest_function),
        ] {
            if !path.contains(':') {
                return Err(anyhow::anyhow!(
                    "store.{name} must look like module:function, got {path}"
                ));
            }
        }
        Ok(())
    }
}

fn validate_http_url(raw: &str, name: &str) -> anyhow::Result<()> {
    let url = Url::parse(raw).map_err(|e| anyhow::anyhow!("{name} is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow::anyhow!(
            "{name} must use http or https, got {other}"
        )),
    }
}
