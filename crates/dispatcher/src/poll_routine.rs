use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use listener_domain::{
    sort_for_ingestion, DispatchRecord, DispatchSource, EventStore, PollCursor, PollOutcome,
    RoutineStatus,
};
use listener_errors::ListenerResult;
use listener_infrastructure::TimeoutHandler;
use listener_observability::MetricsCollector;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Source of "now" for a poll cycle.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub poll_interval: Duration,
    /// Overlap re-queried every cycle to pick up late-arriving dispatches.
    pub lookback: Duration,
    /// Bound on every store call.
    pub request_timeout: Duration,
    /// Bound on one whole fetch, which may span several provider requests.
    pub fetch_timeout: Duration,
    /// Only used to render local times in logs.
    pub timezone: Tz,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            lookback: Duration::from_secs(120),
            request_timeout: Duration::from_secs(15),
            fetch_timeout: Duration::from_secs(150),
            timezone: Tz::UTC,
        }
    }
}

struct LoopHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Timer-driven ingestion loop for one dispatch source.
///
/// At most one cycle runs at a time: the cursor lives behind an async mutex
/// that doubles as the single-flight guard, and the status snapshot is
/// replaced in one assignment at the end of each cycle.
pub struct DispatchPollRoutine {
    name: String,
    source: Arc<dyn DispatchSource>,
    store: Arc<dyn EventStore>,
    settings: PollSettings,
    timeouts: TimeoutHandler,
    metrics: MetricsCollector,
    clock: Clock,
    status: RwLock<RoutineStatus>,
    cursor: Mutex<PollCursor>,
    handle: Mutex<Option<LoopHandle>>,
}

impl DispatchPollRoutine {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn DispatchSource>,
        store: Arc<dyn EventStore>,
        settings: PollSettings,
    ) -> Self {
        let name = name.into();
        Self {
            metrics: MetricsCollector::new(&name),
            timeouts: TimeoutHandler::new(settings.fetch_timeout, settings.request_timeout),
            name,
            source,
            store,
            settings,
            clock: Arc::new(Utc::now),
            status: RwLock::new(RoutineStatus::default()),
            cursor: Mutex::new(PollCursor::empty()),
            handle: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.get_status().running
    }

    /// Consistent snapshot of the last published status. Never waits on a
    /// running cycle.
    pub fn get_status(&self) -> RoutineStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recover the cursor and start polling. The first cycle runs
    /// immediately. Calling this while already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            info!(routine = %self.name, "Poll routine already running");
            return;
        }

        let cursor = self.recover_cursor().await;
        {
            let mut status = self.write_status();
            *status = RoutineStatus {
                running: true,
                cursor: cursor.position(),
                ..status.clone()
            };
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let routine = Arc::clone(self);
        let span = info_span!("routine", name = %self.name, source = %self.source.source_id());
        let task = tokio::spawn(routine.run_loop(shutdown_rx).instrument(span));

        info!(
            routine = %self.name,
            poll_interval = ?self.settings.poll_interval,
            lookback = ?self.settings.lookback,
            "Poll routine started"
        );
        *handle = Some(LoopHandle { shutdown_tx, task });
    }

    /// Stop scheduling cycles and wait for an in-flight cycle to finish.
    /// Safe to call before `start()` and more than once.
    pub async fn stop(&self) {
        let mut handle = self.handle.lock().await;
        {
            let mut status = self.write_status();
            if status.running {
                *status = RoutineStatus {
                    running: false,
                    ..status.clone()
                };
            }
        }

        let Some(LoopHandle { shutdown_tx, task }) = handle.take() else {
            debug!(routine = %self.name, "Poll routine not running, nothing to stop");
            return;
        };

        // the loop may already have exited; nothing to signal then
        let _ = shutdown_tx.send(());
        if let Err(e) = task.await {
            error!(routine = %self.name, "Poll loop terminated abnormally: {}", e);
        }

        // a manual poll_once() may still hold the cursor
        drop(self.cursor.lock().await);
        info!(routine = %self.name, "Poll routine stopped");
    }

    /// Run one cycle now. Returns `None` without doing anything when another
    /// cycle is in flight.
    pub async fn poll_once(&self) -> Option<PollOutcome> {
        let Ok(mut cursor) = self.cursor.try_lock() else {
            debug!(routine = %self.name, "Poll cycle already in flight, skipping");
            return None;
        };

        let started = Instant::now();
        let now = (self.clock)();
        let outcome = self.run_cycle(now, &mut cursor).await;
        let status = self.publish(now, &outcome);

        self.metrics.record_cycle(
            outcome.fetched,
            outcome.inserted,
            outcome.skipped,
            outcome.failed,
            started.elapsed(),
        );

        let local_time = now.with_timezone(&self.settings.timezone).to_rfc3339();
        match &outcome.error {
            None => {
                self.metrics.record_recovery();
                if outcome.truncated {
                    warn!(
                        routine = %self.name,
                        fetched = outcome.fetched,
                        cursor = ?outcome.cursor_after.position(),
                        "Source returned a partial window, polling again for the rest"
                    );
                }
                if outcome.inserted > 0 {
                    info!(
                        routine = %self.name,
                        fetched = outcome.fetched,
                        inserted = outcome.inserted,
                        skipped = outcome.skipped,
                        cursor = ?outcome.cursor_after.position(),
                        local_time = %local_time,
                        "Poll cycle completed"
                    );
                } else {
                    debug!(
                        routine = %self.name,
                        fetched = outcome.fetched,
                        skipped = outcome.skipped,
                        local_time = %local_time,
                        "Poll cycle completed, nothing new"
                    );
                }
            }
            Some(e) => {
                self.metrics.record_failure(status.consecutive_failures);
                warn!(
                    routine = %self.name,
                    consecutive_failures = status.consecutive_failures,
                    fetched = outcome.fetched,
                    inserted = outcome.inserted,
                    failed = outcome.failed,
                    local_time = %local_time,
                    "Poll cycle failed: {}",
                    e
                );
            }
        }

        Some(outcome)
    }

    async fn run_loop(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval(self.settings.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!("Shutdown signal received, leaving poll loop");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        None => debug!("Previous cycle still running, tick skipped"),
                        Some(outcome) if outcome.has_backlog() => {
                            debug!("Source has more dispatches waiting, polling again");
                            ticker.reset_immediately();
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }

    async fn run_cycle(&self, now: DateTime<Utc>, cursor: &mut PollCursor) -> PollOutcome {
        let cursor_before = *cursor;
        let mut outcome = PollOutcome {
            cursor_before,
            cursor_after: cursor_before,
            ..PollOutcome::default()
        };

        let lookback = chrono::Duration::from_std(self.settings.lookback)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let since = cursor.query_since(now, lookback);

        let fetched = self
            .timeouts
            .external_api_operation(self.source.fetch_since(since), "fetch_since")
            .await;
        let (mut records, truncated) = match fetched {
            Ok(batch) => (batch.records, batch.truncated),
            Err(e) => {
                outcome.error = Some(format!(
                    "fetch from {} failed: {}",
                    self.source.source_id(),
                    e
                ));
                return outcome;
            }
        };

        sort_for_ingestion(&mut records);
        outcome.fetched = records.len();
        outcome.truncated = truncated;

        // Stop at the first failure so the store never holds a dispatch newer
        // than one still missing. The rest is retried next cycle.
        let mut failure: Option<(usize, String)> = None;
        for (index, record) in records.iter().enumerate() {
            match self.ingest(record).await {
                Ok(true) => outcome.inserted += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed = 1;
                    warn!(
                        dispatch_id = %record.dispatch_id,
                        occurred_at = %record.occurred_at,
                        "Failed to persist dispatch: {}",
                        e
                    );
                    failure = Some((index, format!("dispatch {}: {}", record.dispatch_id, e)));
                    break;
                }
            }
        }

        let durable_until = match &failure {
            None => records.last().map(|r| r.occurred_at),
            Some((index, _)) => watermark_before(&records, *index),
        };
        if let Some(position) = durable_until {
            cursor.advance_to(position);
        }
        outcome.cursor_after = *cursor;

        if let Some((index, detail)) = failure {
            outcome.error = Some(format!(
                "failed to persist {}, {} of {} dispatches left for the next cycle",
                detail,
                outcome.fetched - index,
                outcome.fetched
            ));
        }

        outcome
    }

    /// Returns true when the dispatch was new and got written.
    async fn ingest(&self, record: &DispatchRecord) -> ListenerResult<bool> {
        let exists = self
            .timeouts
            .store_operation(self.store.exists(&record.dispatch_id), "exists")
            .await?;
        if exists {
            debug!(dispatch_id = %record.dispatch_id, "Dispatch already recorded, skipping");
            return Ok(false);
        }

        self.timeouts
            .store_operation(self.store.insert(record), "insert")
            .await?;
        info!(
            dispatch_id = %record.dispatch_id,
            dispatch_type = %record.dispatch_type,
            occurred_at = %record.occurred_at,
            "Dispatch ingested"
        );
        Ok(true)
    }

    fn publish(&self, now: DateTime<Utc>, outcome: &PollOutcome) -> RoutineStatus {
        let mut status = self.write_status();
        let inserted = outcome.inserted as u64;
        let next = match &outcome.error {
            None => status.succeeded(now, outcome.cursor_after, inserted),
            Some(e) => status.failed(now, e.clone(), outcome.cursor_after, inserted),
        };
        *status = next.clone();
        next
    }

    async fn recover_cursor(&self) -> PollCursor {
        let mut cursor = self.cursor.lock().await;
        let latest = self
            .timeouts
            .store_operation(self.store.latest_occurred_at(), "latest_occurred_at")
            .await;

        match latest {
            Ok(Some(position)) => {
                if cursor.advance_to(position) {
                    info!(
                        routine = %self.name,
                        cursor = %position,
                        "Cursor recovered from event store"
                    );
                }
            }
            Ok(None) => {
                info!(
                    routine = %self.name,
                    "Event store has no dispatches, starting from the lookback window"
                );
            }
            Err(e) => {
                warn!(
                    routine = %self.name,
                    "Cursor recovery failed, starting from the lookback window: {}",
                    e
                );
            }
        }
        *cursor
    }

    fn write_status(&self) -> RwLockWriteGuard<'_, RoutineStatus> {
        self.status.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Greatest `occurred_at` strictly before the record at `failed_index`.
/// `records` must be in ingestion order.
fn watermark_before(records: &[DispatchRecord], failed_index: usize) -> Option<DateTime<Utc>> {
    let failed_at = records.get(failed_index)?.occurred_at;
    records[..failed_index]
        .iter()
        .rev()
        .map(|r| r.occurred_at)
        .find(|at| *at < failed_at)
}
