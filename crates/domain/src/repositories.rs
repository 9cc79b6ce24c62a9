//! Event store abstraction used by the poll routine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use listener_errors::ListenerResult;

use crate::entities::DispatchRecord;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn exists(&self, dispatch_id: &str) -> ListenerResult<bool>;
    async fn insert(&self, record: &DispatchRecord) -> ListenerResult<()>;
    /// Newest `occurred_at` recorded so far, used to re-derive the cursor
    /// after a restart.
    async fn latest_occurred_at(&self) -> ListenerResult<Option<DateTime<Utc>>>;
}
