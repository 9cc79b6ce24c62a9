use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use listener_config::StoreConfig;
use listener_domain::{DispatchRecord, EventStore};
use listener_errors::{ListenerError, ListenerResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

/// Event store backed by a Convex deployment's HTTP function API.
pub struct ConvexEventStore {
    deployment_url: String,
    exists_function: String,
    insert_function: String,
    latest_function: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ConvexResponse {
    Success {
        #[serde(default)]
        value: Value,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        error_message: String,
    },
}

impl ConvexEventStore {
    pub fn new(config: &StoreConfig, request_timeout: Duration) -> ListenerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ListenerError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            deployment_url: config.convex_url.trim_end_matches('/').to_string(),
            exists_function: config.exists_function.clone(),
            insert_function: config.insert_function.clone(),
            latest_function: config.latest_function.clone(),
            http_client,
        })
    }

    async fn call(&self, kind: &str, path: &str, args: Value) -> ListenerResult<Value> {
        let url = format!("{}/api/{}", self.deployment_url, kind);
        let body = json!({ "path": path, "args": args, "format": "json" });

        let response = self.http_client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ListenerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ConvexResponse = response
            .json()
            .await
            .map_err(|e| ListenerError::malformed(format!("unexpected Convex response: {e}")))?;

        match parsed {
            ConvexResponse::Success { value } => Ok(value),
            ConvexResponse::Error { error_message } => Err(ListenerError::store(format!(
                "{path} failed: {error_message}"
            ))),
        }
    }
}

#[async_trait]
impl EventStore for ConvexEventStore {
    async fn exists(&self, dispatch_id: &str) -> ListenerResult<bool> {
        let value = self
            .call(
                "query",
                &self.exists_function,
                json!({ "dispatchId": dispatch_id }),
            )
            .await?;

        match value {
            Value::Bool(found) => Ok(found),
            // queries that return the document itself
            Value::Null => Ok(false),
            Value::Object(_) => Ok(true),
            other => Err(ListenerError::malformed(format!(
                "{} returned {other}, expected a boolean",
                self.exists_function
            ))),
        }
    }

    async fn insert(&self, record: &DispatchRecord) -> ListenerResult<()> {
        debug!(dispatch_id = %record.dispatch_id, "inserting dispatch into Convex");
        self.call("mutation", &self.insert_function, insert_args(record))
            .await
            .map(|_| ())
    }

    async fn latest_occurred_at(&self) -> ListenerResult<Option<DateTime<Utc>>> {
        let value = self
            .call("query", &self.latest_function, json!({}))
            .await?;
        parse_timestamp(&value)
    }
}

/// Convex rejects `null` for optional fields, so absent values are omitted.
fn insert_args(record: &DispatchRecord) -> Value {
    let mut args = Map::new();
    args.insert("dispatchId".into(), json!(record.dispatch_id));
    args.insert(
        "occurredAt".into(),
        json!(record.occurred_at.timestamp_millis()),
    );
    args.insert("type".into(), json!(record.dispatch_type));
    if let Some(address) = &record.location.address {
        args.insert("address".into(), json!(address));
    }
    if let Some(latitude) = record.location.latitude {
        args.insert("latitude".into(), json!(latitude));
    }
    if let Some(longitude) = record.location.longitude {
        args.insert("longitude".into(), json!(longitude));
    }
    args.insert("payload".into(), record.payload.clone());
    Value::Object(args)
}

// Convex stores times as epoch milliseconds; ISO strings are accepted too.
fn parse_timestamp(value: &Value) -> ListenerResult<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let millis = n
                .as_f64()
                .ok_or_else(|| ListenerError::malformed(format!("invalid timestamp {n}")))?;
            Utc.timestamp_millis_opt(millis as i64)
                .single()
                .map(Some)
                .ok_or_else(|| ListenerError::malformed(format!("timestamp out of range: {n}")))
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| ListenerError::malformed(format!("invalid timestamp {s}: {e}"))),
        other => Err(ListenerError::malformed(format!(
            "expected a timestamp, got {other}"
        ))),
    }
}
