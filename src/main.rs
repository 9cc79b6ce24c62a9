use anyhow::{Context, Result};
use clap::{Arg, Command};
use firstdue_listener::app::Application;
use firstdue_listener::shutdown::{wait_for_shutdown_signal, ShutdownManager};
use listener_config::{AppConfig, OutputFormat};
use listener_observability::{init_logging, init_metrics};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("firstdue-listener")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Polls FirstDue for new dispatches and records them in Convex")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Optional TOML config file; environment variables override it"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log output format (defaults to json in production)")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    // Missing credentials end the process here with a non-zero exit code.
    let config = AppConfig::load(config_path).context("Failed to load configuration")?;

    let log_format = match matches.get_one::<String>("log-format") {
        Some(format) => format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?,
        None => config.log_format(),
    };
    init_logging(config.observability.log_level, log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "Starting FirstDue dispatch listener"
    );

    let metrics = if config.observability.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    let shutdown_timeout = config.routine.shutdown_timeout();
    let app = Application::new(config, metrics)?;
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let shutdown_rx = shutdown_manager.subscribe();
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::select! {
        _ = wait_for_shutdown_signal() => {}
        result = &mut app_handle => {
            // the server stopped without being asked to
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(e).context("Application task panicked"),
            };
        }
    }

    info!("Shutting down");
    shutdown_manager.shutdown();

    match tokio::time::timeout(shutdown_timeout, app_handle).await {
        Ok(Ok(Ok(()))) => info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => error!("Application stopped with an error: {:#}", e),
        Ok(Err(e)) => error!("Application task failed: {}", e),
        Err(_) => warn!(timeout = ?shutdown_timeout, "Shutdown timed out, exiting anyway"),
    }

    Ok(())
}
