//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use changecast_domain::{ChangecastError, JitterMode};
use changecast_infra::config;
use tempfile::Builder;

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "rate_limit": { "requests_per_second": 5 },
        "batch": { "workers": 6, "deadline_secs": 840 },
        "retry": { "max_attempts": 4, "jitter": "none", "max_total_secs": null },
        "reconciler": { "default_timezone": "America/New_York" },
        "event_guard": {
            "output_prefixes": ["processed/", "reports/"],
            "marker_key": "x-amz-meta-generated-by",
            "marker_value": "changecast"
        },
        "logging": { "level": "debug", "json": true }
    }"#;

    let mut temp_file =
        Builder::new().suffix(".json").tempfile().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    assert_eq!(config.rate_limit.requests_per_second, 5);
    assert_eq!(config.batch.workers, 6);
    assert_eq!(config.batch.deadline_secs, Some(840));
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.jitter, JitterMode::None);
    assert_eq!(config.retry.max_total_secs, None);
    assert_eq!(config.reconciler.default_timezone, "America/New_York");
    assert!(config.reconciler.default_tz().is_ok());
    assert_eq!(config.event_guard.output_prefixes, vec!["processed/", "reports/"]);
    assert_eq!(config.event_guard.marker_value, "changecast");
    assert!(config.logging.json);
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = r#"
[rate_limit]
requests_per_second = 20

[retry]
initial_delay_ms = 500
backoff_base = 3.0
max_delay_ms = 30000

[event_guard]
output_prefixes = ["out/"]
"#;

    let mut temp_file =
        Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    temp_file.write_all(toml_content.as_bytes()).expect("Failed to write to temp file");

    let config = config::load_from_file(Some(temp_file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert_eq!(config.rate_limit.requests_per_second, 20);
    assert_eq!(config.retry.initial_delay_ms, 500);
    assert!((config.retry.backoff_base - 3.0).abs() < f64::EPSILON);
    assert_eq!(config.event_guard.output_prefixes, vec!["out/"]);
    // Sections not present keep their defaults
    assert_eq!(config.batch.workers, 4);
    assert_eq!(config.reconciler.default_timezone, "UTC");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let mut temp_file =
        Builder::new().suffix(".toml").tempfile().expect("Failed to create temp file");
    temp_file.write_all(b"[rate_limit\nrequests_per_second = ").expect("write");

    let err = config::load_from_file(Some(temp_file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, ChangecastError::Config(ref m) if m.contains("Invalid TOML format")));
}

#[test]
fn test_invalid_retry_settings_rejected() {
    let mut temp_file =
        Builder::new().suffix(".json").tempfile().expect("Failed to create temp file");
    temp_file
        .write_all(br#"{ "retry": { "initial_delay_ms": 5000, "max_delay_ms": 100 } }"#)
        .expect("write");

    let err = config::load_from_file(Some(temp_file.path().to_path_buf())).unwrap_err();
    assert!(err.to_string().contains("retry.initial_delay_ms"));
}
