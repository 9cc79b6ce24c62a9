use std::sync::Arc;

use anyhow::{Context, Result};
use listener_api::{create_app, AppState};
use listener_config::AppConfig;
use listener_dispatcher::{DispatchPollRoutine, PollSettings};
use listener_infrastructure::{ConvexEventStore, FirstDueClient};
use listener_observability::PrometheusHandle;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// 主应用程序
///
/// Owns the poll routine and the HTTP surface over it. Clients are built once
/// here and handed to the routine; nothing is global.
pub struct Application {
    config: AppConfig,
    routine: Arc<DispatchPollRoutine>,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    pub fn new(config: AppConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        let source =
            FirstDueClient::new(&config.firstdue).context("Failed to create FirstDue client")?;
        let store = ConvexEventStore::new(&config.store, config.firstdue.request_timeout())
            .context("Failed to create Convex client")?;

        let settings = PollSettings {
            poll_interval: config.routine.poll_interval(),
            lookback: config.routine.lookback(),
            request_timeout: config.firstdue.request_timeout(),
            fetch_timeout: config.firstdue.fetch_timeout(),
            timezone: config.parsed_timezone()?,
        };
        let routine = Arc::new(DispatchPollRoutine::new(
            config.routine.name.clone(),
            Arc::new(source),
            Arc::new(store),
            settings,
        ));

        info!(
            routine = %config.routine.name,
            environment = %config.environment,
            timezone = %config.timezone,
            "Application initialized"
        );

        Ok(Self::with_routine(config, routine, metrics))
    }

    /// Assemble around an already built routine.
    pub fn with_routine(
        config: AppConfig,
        routine: Arc<DispatchPollRoutine>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config,
            routine,
            metrics,
        }
    }

    pub fn routine(&self) -> Arc<DispatchPollRoutine> {
        Arc::clone(&self.routine)
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = self.config.api.bind_address();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("Failed to bind {bind_address}"))?;

        self.serve(listener, shutdown_rx).await
    }

    /// Start the routine, serve HTTP on `listener`, and on shutdown drain the
    /// server and stop the routine.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        self.routine.start().await;

        let mut state = AppState::new(
            Arc::clone(&self.routine),
            self.config.routine.unhealthy_failure_threshold,
        )
        .with_request_timeout(std::time::Duration::from_secs(
            self.config.api.request_timeout_seconds,
        ))
        .with_version(env!("CARGO_PKG_VERSION"));
        if let Some(handle) = &self.metrics {
            state = state.with_metrics(handle.clone());
        }

        let local_addr = listener.local_addr().context("Listener has no local address")?;
        info!("HTTP server listening on http://{}", local_addr);

        let served = axum::serve(listener, create_app(state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server received shutdown signal");
            })
            .await;

        self.routine.stop().await;

        if let Err(e) = &served {
            error!("HTTP server failed: {}", e);
        }
        served.context("HTTP server failed")
    }
}
