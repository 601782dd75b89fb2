//! Tests for environment configuration

use super::*;
use std::collections::HashMap;
use std::time::Duration;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn required() -> Vec<(&'static str, &'static str)> {
    vec![
        ("UNLEASH_URL", "https://flags.example.com/api/v4/feature_flags/unleash/42"),
        ("UNLEASH_INSTANCE_ID", "instance-abc"),
    ]
}

#[test]
fn test_defaults_with_required_vars() {
    let config = AppConfig::from_vars(vars(&required())).expect("config should load");

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.read_timeout, Duration::from_secs(15));
    assert_eq!(config.server.write_timeout, Duration::from_secs(60));
    assert_eq!(config.server.idle_timeout, Duration::from_secs(30));
    assert_eq!(config.server.max_header_bytes, None);
    assert_eq!(config.grace_period, Duration::from_secs(30));

    assert_eq!(config.unleash.app_name, "Production");
    assert_eq!(config.unleash.instance_id, "instance-abc");
    assert_eq!(config.unleash.refresh_interval, Duration::from_secs(15));
    assert!(config.unleash.disable_metrics);
}

#[test]
fn test_missing_url_is_error() {
    let err = AppConfig::from_vars(vars(&[("UNLEASH_INSTANCE_ID", "x")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("UNLEASH_URL"));
}

#[test]
fn test_missing_instance_id_is_error() {
    let err = AppConfig::from_vars(vars(&[("UNLEASH_URL", "http://localhost:4242/api")]))
        .unwrap_err();
    assert_eq!(err, ConfigError::Missing("UNLEASH_INSTANCE_ID"));
}

#[test]
fn test_blank_value_treated_as_missing() {
    let err = AppConfig::from_vars(vars(&[
        ("UNLEASH_URL", "   "),
        ("UNLEASH_INSTANCE_ID", "x"),
    ]))
    .unwrap_err();
    assert_eq!(err, ConfigError::Missing("UNLEASH_URL"));
}

#[test]
fn test_url_must_be_http() {
    let err = AppConfig::from_vars(vars(&[
        ("UNLEASH_URL", "ftp://flags.example.com"),
        ("UNLEASH_INSTANCE_ID", "x"),
    ]))
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { name: "UNLEASH_URL", .. }));
}

#[test]
fn test_trailing_slash_trimmed_from_url() {
    let config = AppConfig::from_vars(vars(&[
        ("UNLEASH_URL", "http://localhost:4242/api/"),
        ("UNLEASH_INSTANCE_ID", "x"),
    ]))
    .expect("config should load");
    assert_eq!(config.unleash.url, "http://localhost:4242/api");
}

#[test]
fn test_overrides() {
    let mut pairs = required();
    pairs.extend([
        ("FLAGSERVE_PORT", "8081"),
        ("UNLEASH_APP_NAME", "staging"),
        ("UNLEASH_REFRESH_SECS", "5"),
        ("UNLEASH_DISABLE_METRICS", "false"),
        ("UNLEASH_METRICS_SECS", "120"),
        ("UNLEASH_READY_TIMEOUT_SECS", "3"),
    ]);

    let config = AppConfig::from_vars(vars(&pairs)).expect("config should load");

    assert_eq!(config.server.port, 8081);
    assert_eq!(config.unleash.app_name, "staging");
    assert_eq!(config.unleash.refresh_interval, Duration::from_secs(5));
    assert!(!config.unleash.disable_metrics);
    assert_eq!(config.unleash.metrics_interval, Duration::from_secs(120));
    assert_eq!(config.unleash.ready_timeout, Duration::from_secs(3));
}

#[test]
fn test_invalid_port_is_error() {
    let mut pairs = required();
    pairs.push(("FLAGSERVE_PORT", "70000"));

    let err = AppConfig::from_vars(vars(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { name: "FLAGSERVE_PORT", .. }));
}

#[test]
fn test_zero_refresh_interval_rejected() {
    let mut pairs = required();
    pairs.push(("UNLEASH_REFRESH_SECS", "0"));

    let err = AppConfig::from_vars(vars(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { name: "UNLEASH_REFRESH_SECS", .. }));
}

#[test]
fn test_invalid_bool_is_error() {
    let mut pairs = required();
    pairs.push(("UNLEASH_DISABLE_METRICS", "maybe"));

    let err = AppConfig::from_vars(vars(&pairs)).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid { name: "UNLEASH_DISABLE_METRICS", .. }
    ));
}
