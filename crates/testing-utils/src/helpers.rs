//! Common testing patterns.

use chrono::{DateTime, TimeZone, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// A fixed point in time, `secs` after 2026-03-01T12:00:00Z.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
/// Uses tokio time, so it also works under `start_paused`.
pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition().await {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition().await
}
