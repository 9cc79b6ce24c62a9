//! Timeout handling for calls that leave the process.
//!
//! Every call to the dispatch provider or the event store goes through here
//! so a hung connection turns into a `ListenerError::Timeout` instead of
//! stalling the poll loop.

use listener_errors::{ListenerError, ListenerResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutHandler {
    external_api_timeout: Duration,
    store_timeout: Duration,
}

impl TimeoutHandler {
    pub fn new(external_api_timeout: Duration, store_timeout: Duration) -> Self {
        Self {
            external_api_timeout,
            store_timeout,
        }
    }

    pub async fn external_api_operation<F, T>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> ListenerResult<T>
    where
        F: Future<Output = ListenerResult<T>>,
    {
        execute_with_timeout(operation, self.external_api_timeout, "external API", operation_name)
            .await
    }

    pub async fn store_operation<F, T>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> ListenerResult<T>
    where
        F: Future<Output = ListenerResult<T>>,
    {
        execute_with_timeout(operation, self.store_timeout, "event store", operation_name).await
    }
}

async fn execute_with_timeout<F, T>(
    operation: F,
    timeout_duration: Duration,
    operation_type: &str,
    operation_name: &str,
) -> ListenerResult<T>
where
    F: Future<Output = ListenerResult<T>>,
{
    match timeout(timeout_duration, operation).await {
        Ok(result) => result,
        Err(_) => {
            let error_msg = format!(
                "{operation_type} operation '{operation_name}' timed out after {timeout_duration:?}"
            );
            warn!("{}", error_msg);
            Err(ListenerError::timeout(error_msg))
        }
    }
}
