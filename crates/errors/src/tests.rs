use crate::*;

#[test]
fn test_listener_error_display() {
    let network_error = ListenerError::network("connection refused");
    assert_eq!(network_error.to_string(), "network error: connection refused");

    let status_error = ListenerError::HttpStatus {
        status: 502,
        body: "bad gateway".to_string(),
    };
    assert_eq!(
        status_error.to_string(),
        "unexpected HTTP status 502: bad gateway"
    );

    let timeout_error = ListenerError::timeout("fetch dispatches");
    assert_eq!(timeout_error.to_string(), "operation timed out: fetch dispatches");

    let config_error = ListenerError::config_error("FIRSTDUE_API_KEY is not set");
    assert_eq!(
        config_error.to_string(),
        "configuration error: FIRSTDUE_API_KEY is not set"
    );
}

#[test]
fn test_only_configuration_errors_are_fatal() {
    assert!(ListenerError::config_error("missing").is_fatal());

    let transient = [
        ListenerError::network("reset"),
        ListenerError::timeout("slow"),
        ListenerError::malformed("not an array"),
        ListenerError::store("insert rejected"),
        ListenerError::HttpStatus {
            status: 503,
            body: String::new(),
        },
        ListenerError::Internal("bug".to_string()),
    ];
    for err in transient {
        assert!(err.is_transient(), "{err} should be transient");
        assert!(!err.is_fatal());
    }
}

#[test]
fn test_serde_json_error_conversion() {
    let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let listener_err: ListenerError = err.into();
    assert!(matches!(listener_err, ListenerError::Serialization(_)));
}

#[test]
fn test_is_timeout() {
    assert!(ListenerError::timeout("x").is_timeout());
    assert!(!ListenerError::network("x").is_timeout());
}
