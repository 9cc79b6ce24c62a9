use async_trait::async_trait;
use chrono::{DateTime, Utc};
use listener_errors::ListenerResult;

use crate::entities::DispatchBatch;

/// Source of dispatch records, normally the FirstDue REST API.
#[async_trait]
pub trait DispatchSource: Send + Sync {
    /// Dispatches whose `occurred_at` is at or after `since`.
    ///
    /// Order within the batch is not guaranteed; callers sort. A truncated
    /// batch must be the oldest part of the window, so that advancing to its
    /// newest record never skips an unfetched dispatch.
    async fn fetch_since(&self, since: DateTime<Utc>) -> ListenerResult<DispatchBatch>;

    fn source_id(&self) -> &str;
}
