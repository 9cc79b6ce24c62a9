use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use listener_config::FirstDueConfig;
use listener_domain::{DispatchBatch, DispatchLocation, DispatchRecord, DispatchSource};
use listener_errors::{ListenerError, ListenerResult};
use reqwest::header::{HeaderMap, AUTHORIZATION, LINK};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// HTTP client for the FirstDue dispatches endpoint.
pub struct FirstDueClient {
    base_url: String,
    api_key: String,
    page_size: u32,
    max_pages: u32,
    http_client: reqwest::Client,
}

/// Fields the listener reads; everything else rides along in the payload.
#[derive(Debug, Deserialize)]
struct FirstDueDispatch {
    id: Value,
    #[serde(rename = "type", default)]
    dispatch_type: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state_code: Option<String>,
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(default)]
    longitude: Option<Value>,
    created_at: DateTime<Utc>,
}

impl FirstDueClient {
    pub fn new(config: &FirstDueConfig) -> ListenerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ListenerError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            http_client,
        })
    }

    async fn fetch_page(
        &self,
        since: DateTime<Utc>,
        page: u32,
    ) -> ListenerResult<(Vec<DispatchRecord>, bool)> {
        let url = format!("{}/dispatches", self.base_url);
        let since_param = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let page_param = page.to_string();
        let per_page_param = self.page_size.to_string();

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .query(&[
                ("since", since_param.as_str()),
                ("page", page_param.as_str()),
                ("per_page", per_page_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("FirstDue request failed: HTTP {} - {}", status, body);
            return Err(ListenerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let has_next = has_next_link(response.headers());
        let body: Value = response
            .json()
            .await
            .map_err(|e| ListenerError::malformed(format!("dispatch response is not JSON: {e}")))?;

        Ok((parse_dispatches(body)?, has_next))
    }
}

#[async_trait]
impl DispatchSource for FirstDueClient {
    async fn fetch_since(&self, since: DateTime<Utc>) -> ListenerResult<DispatchBatch> {
        let mut records: Vec<DispatchRecord> = Vec::new();
        let mut oldest_first = true;
        let mut page = 1;

        loop {
            let (batch, has_next) = self.fetch_page(since, page).await?;
            debug!(page, count = batch.len(), "fetched FirstDue dispatch page");
            if let (Some(newest_seen), Some(page_oldest)) = (
                records.iter().map(|r| r.occurred_at).max(),
                batch.iter().map(|r| r.occurred_at).min(),
            ) {
                oldest_first &= page_oldest >= newest_seen;
            }
            let empty = batch.is_empty();
            records.extend(batch);

            if !has_next || empty {
                return Ok(DispatchBatch::complete(records));
            }
            if page >= self.max_pages {
                break;
            }
            page += 1;
        }

        // a capped newest-first fetch would leave older dispatches behind the cursor
        if !oldest_first {
            return Err(ListenerError::malformed(format!(
                "FirstDue returned pages newest first and more than {} pages are pending",
                self.max_pages
            )));
        }
        warn!(
            max_pages = self.max_pages,
            fetched = records.len(),
            "FirstDue page cap reached, newer dispatches will be fetched next cycle"
        );
        Ok(DispatchBatch::partial(records))
    }

    fn source_id(&self) -> &str {
        "firstdue"
    }
}

fn has_next_link(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("rel=\"next\""))
}

fn parse_dispatches(body: Value) -> ListenerResult<Vec<DispatchRecord>> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(ListenerError::malformed(format!(
                "expected an array of dispatches, got {}",
                json_kind(&other)
            )))
        }
    };

    items.into_iter().map(parse_dispatch).collect()
}

fn parse_dispatch(raw: Value) -> ListenerResult<DispatchRecord> {
    let wire: FirstDueDispatch = serde_json::from_value(raw.clone())
        .map_err(|e| ListenerError::malformed(format!("invalid dispatch: {e}")))?;

    let dispatch_id = match &wire.id {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(ListenerError::malformed(format!(
                "dispatch id must be a string or number, got {}",
                json_kind(other)
            )))
        }
    };

    let address = [wire.address, wire.city, wire.state_code]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>();

    Ok(DispatchRecord {
        dispatch_id,
        occurred_at: wire.created_at,
        dispatch_type: wire.dispatch_type.unwrap_or_else(|| "unknown".to_string()),
        location: DispatchLocation {
            address: (!address.is_empty()).then(|| address.join(", ")),
            latitude: wire.latitude.as_ref().and_then(coordinate),
            longitude: wire.longitude.as_ref().and_then(coordinate),
        },
        payload: raw,
    })
}

// FirstDue sends coordinates as numbers or as numeric strings.
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dispatch_maps_fields() {
        let raw = json!({
            "id": 4021,
            "type": "Structure Fire",
            "address": "100 Main St",
            "city": "Springfield",
            "state_code": "IL",
            "latitude": "39.78",
            "longitude": -89.65,
            "unit_codes": ["E1", "L2"],
            "created_at": "2026-03-01T12:00:05Z"
        });

        let record = parse_dispatch(raw.clone()).unwrap();
        assert_eq!(record.dispatch_id, "4021");
        assert_eq!(record.dispatch_type, "Structure Fire");
        assert_eq!(
            record.location.address.as_deref(),
            Some("100 Main St, Springfield, IL")
        );
        assert_eq!(record.location.latitude, Some(39.78));
        assert_eq!(record.location.longitude, Some(-89.65));
        assert_eq!(record.payload, raw);
    }

    #[test]
    fn test_parse_dispatch_requires_created_at() {
        let err = parse_dispatch(json!({ "id": "abc", "type": "EMS" })).unwrap_err();
        assert!(matches!(err, ListenerError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_dispatch_rejects_bad_id() {
        let err = parse_dispatch(json!({ "id": null, "created_at": "2026-03-01T12:00:05Z" }))
            .unwrap_err();
        assert!(matches!(err, ListenerError::MalformedResponse(_)));
    }

    #[test]
    fn test_non_array_body_is_malformed() {
        let err = parse_dispatches(json!({ "error": "nope" })).unwrap_err();
        assert!(err.to_string().contains("object"));
    }
}
