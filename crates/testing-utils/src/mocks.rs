//! In-memory doubles for the `DispatchSource` and `EventStore` ports.
//!
//! Both record what the routine asked of them so tests can assert on calls
//! rather than only on end state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use listener_domain::{DispatchBatch, DispatchRecord, DispatchSource, EventStore};
use listener_errors::{ListenerError, ListenerResult};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Dispatch source that replays queued responses in order. An empty queue
/// answers with no dispatches.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDispatchSource {
    responses: Arc<Mutex<VecDeque<ListenerResult<DispatchBatch>>>>,
    latency: Option<Duration>,
    calls: Arc<Mutex<Vec<DateTime<Utc>>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedDispatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_records(&self, records: Vec<DispatchRecord>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DispatchBatch::complete(records)));
    }

    /// Answer like a source that hit its page cap with more dispatches left.
    pub fn push_truncated(&self, records: Vec<DispatchRecord>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(DispatchBatch::partial(records)));
    }

    pub fn push_error(&self, error: ListenerError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// `since` arguments of every fetch, in call order.
    pub fn calls(&self) -> Vec<DateTime<Utc>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of fetches that were ever running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DispatchSource for ScriptedDispatchSource {
    async fn fetch_since(&self, since: DateTime<Utc>) -> ListenerResult<DispatchBatch> {
        self.calls.lock().unwrap().push(since);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(DispatchBatch::default()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    fn source_id(&self) -> &str {
        "scripted"
    }
}

/// Event store keyed by dispatch id. Inserting an id twice is an error, the
/// way a unique index would reject it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    records: Arc<Mutex<Vec<DispatchRecord>>>,
    insert_attempts: Arc<Mutex<Vec<String>>>,
    failing_inserts: Arc<Mutex<HashSet<String>>>,
    failing_exists: Arc<Mutex<HashSet<String>>>,
    fail_latest: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DispatchRecord>) -> Self {
        let store = Self::default();
        *store.records.lock().unwrap() = records;
        store
    }

    pub fn fail_insert_for(&self, dispatch_id: &str) {
        self.failing_inserts
            .lock()
            .unwrap()
            .insert(dispatch_id.to_string());
    }

    pub fn fail_exists_for(&self, dispatch_id: &str) {
        self.failing_exists
            .lock()
            .unwrap()
            .insert(dispatch_id.to_string());
    }

    pub fn fail_latest_lookup(&self) {
        self.fail_latest.store(true, Ordering::SeqCst);
    }

    pub fn clear_failures(&self) {
        self.failing_inserts.lock().unwrap().clear();
        self.failing_exists.lock().unwrap().clear();
        self.fail_latest.store(false, Ordering::SeqCst);
    }

    pub fn contains(&self, dispatch_id: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.dispatch_id == dispatch_id)
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Stored ids in insertion order.
    pub fn stored_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.dispatch_id.clone())
            .collect()
    }

    /// Every id passed to `insert`, including failed attempts.
    pub fn insert_attempts(&self) -> Vec<String> {
        self.insert_attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn exists(&self, dispatch_id: &str) -> ListenerResult<bool> {
        if self.failing_exists.lock().unwrap().contains(dispatch_id) {
            return Err(ListenerError::store(format!(
                "injected exists failure for {dispatch_id}"
            )));
        }
        Ok(self.contains(dispatch_id))
    }

    async fn insert(&self, record: &DispatchRecord) -> ListenerResult<()> {
        self.insert_attempts
            .lock()
            .unwrap()
            .push(record.dispatch_id.clone());

        if self
            .failing_inserts
            .lock()
            .unwrap()
            .contains(&record.dispatch_id)
        {
            return Err(ListenerError::store(format!(
                "injected insert failure for {}",
                record.dispatch_id
            )));
        }

        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.dispatch_id == record.dispatch_id) {
            return Err(ListenerError::store(format!(
                "duplicate dispatch id {}",
                record.dispatch_id
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn latest_occurred_at(&self) -> ListenerResult<Option<DateTime<Utc>>> {
        if self.fail_latest.load(Ordering::SeqCst) {
            return Err(ListenerError::network("injected latest lookup failure"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.occurred_at)
            .max())
    }
}
