use std::sync::Arc;
use std::time::Duration;

use firstdue_listener::app::Application;
use firstdue_listener::shutdown::ShutdownManager;
use listener_config::AppConfig;
use listener_dispatcher::{DispatchPollRoutine, PollSettings};
use listener_testing_utils::{dispatch, ts, wait_for, InMemoryEventStore, ScriptedDispatchSource};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

fn routine(
    source: &ScriptedDispatchSource,
    store: &InMemoryEventStore,
) -> Arc<DispatchPollRoutine> {
    Arc::new(
        DispatchPollRoutine::new(
            "app-test",
            Arc::new(source.clone()),
            Arc::new(store.clone()),
            PollSettings::default(),
        )
        .with_clock(Arc::new(|| ts(200))),
    )
}

#[tokio::test]
async fn test_serves_status_and_stops_routine_on_shutdown() {
    let source = ScriptedDispatchSource::new();
    source.push_records(vec![dispatch("1", ts(100))]);
    let store = InMemoryEventStore::new();
    let routine = routine(&source, &store);
    let app = Arc::new(Application::with_routine(
        AppConfig::default(),
        routine.clone(),
        None,
    ));

    let shutdown = ShutdownManager::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = {
        let app = app.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move { app.serve(listener, shutdown_rx).await })
    };

    let ingested = wait_for(
        || {
            let store = store.clone();
            async move { store.count() == 1 }
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(ingested);

    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["routine"]["running"], true);
    assert_eq!(health["routine"]["totalIngested"], 1);

    let ready = reqwest::get(format!("http://{addr}/ready")).await.unwrap();
    assert_eq!(ready.status(), reqwest::StatusCode::OK);

    let info: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));

    shutdown.shutdown();
    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("application did not shut down")
        .unwrap();
    assert!(result.is_ok());
    assert!(!routine.get_status().running);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_shutdown_before_first_request_is_clean() {
    let source = ScriptedDispatchSource::new();
    let store = InMemoryEventStore::new();
    let routine = routine(&source, &store);
    let app = Application::with_routine(AppConfig::default(), routine.clone(), None);

    let shutdown = ShutdownManager::new();
    shutdown.shutdown();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let result = timeout(
        Duration::from_secs(5),
        app.serve(listener, shutdown.subscribe()),
    )
    .await
    .unwrap();

    assert!(result.is_ok());
    assert!(!routine.is_running());
}
