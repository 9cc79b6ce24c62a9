use std::collections::HashMap;
use std::io::Write;

use crate::*;

fn overrides(pairs: &[(&str, &str)]) -> EnvOverrides {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvOverrides::from_lookup(|key| vars.get(key).cloned())
}

fn required() -> Vec<(&'static str, &'static str)> {
    vec![
        ("FIRSTDUE_API_KEY", "fd-secret"),
        ("FIRSTDUE_BASE_URL", "https://sizeup.firstduesizeup.com/fd-api/v1"),
        ("CONVEX_URL", "https://happy-otter-123.convex.cloud"),
    ]
}

#[test]
fn test_load_with_required_env_uses_defaults() {
    let config = AppConfig::load_with_overrides(None, &overrides(&required())).unwrap();

    assert_eq!(config.api.port, 8080);
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.timezone, "UTC");
    assert_eq!(config.routine.poll_interval_seconds, 30);
    assert_eq!(config.routine.lookback_seconds, 120);
    assert_eq!(config.firstdue.api_key, "fd-secret");
    assert_eq!(config.observability.log_level, LogLevel::Info);
    assert_eq!(config.log_format(), OutputFormat::Pretty);
}

#[test]
fn test_conventional_env_vars_override() {
    let mut pairs = required();
    pairs.extend([
        ("PORT", "9090"),
        ("NODE_ENV", "production"),
        ("LOG_LEVEL", "DEBUG"),
        ("TZ", "America/Chicago"),
    ]);
    let config = AppConfig::load_with_overrides(None, &overrides(&pairs)).unwrap();

    assert_eq!(config.api.port, 9090);
    assert_eq!(config.api.bind_address(), "0.0.0.0:9090");
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.observability.log_level, LogLevel::Debug);
    assert_eq!(config.log_format(), OutputFormat::Json);
    assert_eq!(config.parsed_timezone().unwrap(), chrono_tz::America::Chicago);
}

#[test]
fn test_missing_api_key_is_fatal() {
    let pairs = vec![
        ("FIRSTDUE_BASE_URL", "https://sizeup.firstduesizeup.com/fd-api/v1"),
        ("CONVEX_URL", "https://happy-otter-123.convex.cloud"),
    ];
    let err = AppConfig::load_with_overrides(None, &overrides(&pairs)).unwrap_err();
    assert!(format!("{err:#}").contains("FIRSTDUE_API_KEY"));
}

#[test]
fn test_missing_base_url_is_fatal() {
    let pairs = vec![
        ("FIRSTDUE_API_KEY", "fd-secret"),
        ("CONVEX_URL", "https://happy-otter-123.convex.cloud"),
    ];
    let err = AppConfig::load_with_overrides(None, &overrides(&pairs)).unwrap_err();
    assert!(format!("{err:#}").contains("FIRSTDUE_BASE_URL"));
}

#[test]
fn test_missing_store_url_is_fatal() {
    let pairs = vec![
        ("FIRSTDUE_API_KEY", "fd-secret"),
        ("FIRSTDUE_BASE_URL", "https://sizeup.firstduesizeup.com/fd-api/v1"),
    ];
    let err = AppConfig::load_with_overrides(None, &overrides(&pairs)).unwrap_err();
    assert!(format!("{err:#}").contains("CONVEX_URL"));
}

#[test]
fn test_invalid_env_values_are_rejected() {
    let mut bad_port = required();
    bad_port.push(("PORT", "eighty"));
    assert!(AppConfig::load_with_overrides(None, &overrides(&bad_port)).is_err());

    let mut bad_env = required();
    bad_env.push(("NODE_ENV", "staging"));
    assert!(AppConfig::load_with_overrides(None, &overrides(&bad_env)).is_err());

    let mut bad_tz = required();
    bad_tz.push(("TZ", "Mars/Olympus_Mons"));
    assert!(AppConfig::load_with_overrides(None, &overrides(&bad_tz)).is_err());
}

#[test]
fn test_blank_env_values_are_ignored() {
    let mut pairs = required();
    pairs.push(("PORT", "  "));
    let config = AppConfig::load_with_overrides(None, &overrides(&pairs)).unwrap();
    assert_eq!(config.api.port, 8080);
}

#[test]
fn test_config_file_tunables() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[routine]
poll_interval_seconds = 45
lookback_seconds = 300

[firstdue]
page_size = 50
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load_with_overrides(Some(&path), &overrides(&required())).unwrap();

    assert_eq!(config.routine.poll_interval_seconds, 45);
    assert_eq!(config.routine.lookback_seconds, 300);
    assert_eq!(config.firstdue.page_size, 50);
    assert_eq!(config.firstdue.max_pages, 10);
}

#[test]
fn test_fetch_timeout_covers_every_page() {
    let mut config = AppConfig::load_with_overrides(None, &overrides(&required())).unwrap();
    config.firstdue.request_timeout_seconds = 15;
    config.firstdue.max_pages = 10;
    assert_eq!(config.firstdue.fetch_timeout(), std::time::Duration::from_secs(150));

    config.firstdue.max_pages = 1;
    assert_eq!(config.firstdue.fetch_timeout(), config.firstdue.request_timeout());
}

#[test]
fn test_missing_config_file_is_an_error() {
    let err = AppConfig::load_with_overrides(
        Some("/definitely/not/here.toml"),
        &overrides(&required()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let mut config = AppConfig::default();
    config.firstdue.api_key = "k".to_string();
    config.firstdue.base_url = "https://example.com".to_string();
    config.store.convex_url = "https://example.convex.cloud".to_string();
    assert!(config.validate().is_ok());

    config.routine.poll_interval_seconds = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_toml_round_trip_keeps_secrets() {
    let mut config = AppConfig::default();
    config.firstdue.api_key = "k".to_string();
    config.firstdue.base_url = "https://example.com".to_string();
    config.store.convex_url = "https://example.convex.cloud".to_string();

    let rendered = config.to_toml().unwrap();
    let parsed = AppConfig::from_toml(&rendered).unwrap();
    assert_eq!(parsed.firstdue.api_key, "k");
    assert!(!format!("{:?}", parsed.firstdue).contains("\"k\""));
}

#[test]
fn test_environment_parsing() {
    assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
    assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Test);
    assert!("qa".parse::<Environment>().is_err());
}
