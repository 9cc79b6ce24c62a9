use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A dispatch as received from the provider. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub dispatch_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub dispatch_type: String,
    pub location: DispatchLocation,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchLocation {
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DispatchRecord {
    pub fn new(
        dispatch_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        dispatch_type: impl Into<String>,
    ) -> Self {
        Self {
            dispatch_id: dispatch_id.into(),
            occurred_at,
            dispatch_type: dispatch_type.into(),
            location: DispatchLocation::default(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Ascending `occurred_at`, ties broken by id so ordering is total.
pub fn sort_for_ingestion(records: &mut [DispatchRecord]) {
    records.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.dispatch_id.cmp(&b.dispatch_id))
    });
}

/// What one `DispatchSource::fetch_since` call returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchBatch {
    pub records: Vec<DispatchRecord>,
    /// The source stopped paging before the end of the window. The records
    /// are then the oldest part of it and newer dispatches are still waiting.
    pub truncated: bool,
}

impl DispatchBatch {
    pub fn complete(records: Vec<DispatchRecord>) -> Self {
        Self {
            records,
            truncated: false,
        }
    }

    pub fn partial(records: Vec<DispatchRecord>) -> Self {
        Self {
            records,
            truncated: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Watermark of ingestion progress. Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCursor(Option<DateTime<Utc>>);

impl PollCursor {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn at(position: DateTime<Utc>) -> Self {
        Self(Some(position))
    }

    pub fn position(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Returns true when the cursor moved.
    pub fn advance_to(&mut self, candidate: DateTime<Utc>) -> bool {
        match self.0 {
            Some(current) if current >= candidate => false,
            _ => {
                self.0 = Some(candidate);
                true
            }
        }
    }

    /// Start of the query window: `max(cursor, now - lookback)`.
    pub fn query_since(&self, now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
        let floor = now
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        match self.0 {
            Some(cursor) => cursor.max(floor),
            None => floor,
        }
    }
}

/// Operational snapshot published by a poll routine after each cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineStatus {
    pub running: bool,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub cursor: Option<DateTime<Utc>>,
    pub total_ingested: u64,
}

impl RoutineStatus {
    pub fn succeeded(&self, now: DateTime<Utc>, cursor: PollCursor, inserted: u64) -> Self {
        Self {
            running: self.running,
            last_poll_at: Some(now),
            last_success_at: Some(now),
            consecutive_failures: 0,
            last_error: None,
            cursor: cursor.position(),
            total_ingested: self.total_ingested + inserted,
        }
    }

    pub fn failed(
        &self,
        now: DateTime<Utc>,
        error: impl Into<String>,
        cursor: PollCursor,
        inserted: u64,
    ) -> Self {
        Self {
            running: self.running,
            last_poll_at: Some(now),
            last_success_at: self.last_success_at,
            consecutive_failures: self.consecutive_failures.saturating_add(1),
            last_error: Some(error.into()),
            cursor: cursor.position(),
            total_ingested: self.total_ingested + inserted,
        }
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cursor_before: PollCursor,
    pub cursor_after: PollCursor,
    /// The source had more dispatches than one fetch returns.
    pub truncated: bool,
    pub error: Option<String>,
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// A clean cycle that left a backlog behind; worth polling again now.
    pub fn has_backlog(&self) -> bool {
        self.truncated && self.is_success()
    }
}
