use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use std::time::Duration;

/// Per-routine poll metrics. Every handle is a no-op until a recorder is
/// installed, so routines can be built freely in tests.
#[derive(Clone)]
pub struct MetricsCollector {
    poll_cycles_total: Counter,
    poll_failures_total: Counter,
    dispatches_fetched_total: Counter,
    dispatches_inserted_total: Counter,
    dispatches_skipped_total: Counter,
    dispatch_write_failures_total: Counter,
    consecutive_failures: Gauge,
    poll_cycle_duration: Histogram,
}

impl MetricsCollector {
    pub fn new(routine: &str) -> Self {
        let labels = [("routine", routine.to_string())];
        Self {
            poll_cycles_total: counter!("listener_poll_cycles_total", &labels),
            poll_failures_total: counter!("listener_poll_failures_total", &labels),
            dispatches_fetched_total: counter!("listener_dispatches_fetched_total", &labels),
            dispatches_inserted_total: counter!("listener_dispatches_inserted_total", &labels),
            dispatches_skipped_total: counter!("listener_dispatches_skipped_total", &labels),
            dispatch_write_failures_total: counter!(
                "listener_dispatch_write_failures_total",
                &labels
            ),
            consecutive_failures: gauge!("listener_consecutive_failures", &labels),
            poll_cycle_duration: histogram!("listener_poll_cycle_duration_seconds", &labels),
        }
    }

    pub fn record_cycle(
        &self,
        fetched: usize,
        inserted: usize,
        skipped: usize,
        failed: usize,
        duration: Duration,
    ) {
        self.poll_cycles_total.increment(1);
        self.dispatches_fetched_total.increment(fetched as u64);
        self.dispatches_inserted_total.increment(inserted as u64);
        self.dispatches_skipped_total.increment(skipped as u64);
        self.dispatch_write_failures_total.increment(failed as u64);
        self.poll_cycle_duration.record(duration.as_secs_f64());
    }

    pub fn record_failure(&self, consecutive_failures: u32) {
        self.poll_failures_total.increment(1);
        self.consecutive_failures.set(f64::from(consecutive_failures));
    }

    pub fn record_recovery(&self) {
        self.consecutive_failures.set(0.0);
    }
}
