use crate::config::{BackoffShape, ClientConfig};
use crate::error::config::ConfigError;

use std::fs::write;

use tempfile::tempdir;

/// **VALUE**: With no config file at all the client must still start with the
/// documented defaults (launch enabled, ten fixed one-minute cycles).
#[test]
fn given_missing_config_file_when_loaded_then_returns_defaults() {
    // GIVEN: An empty config directory
    let dir = tempdir().unwrap();

    // WHEN: Loading
    let config = ClientConfig::load(dir.path()).unwrap();

    // THEN: Defaults apply
    assert!(!config.debug);
    assert!(!config.no_launch);
    assert_eq!(config.host, "localhost");
    assert_eq!(config.port_query, ["epm", "x", "edhm", "els/config/port"]);
    assert_eq!(config.retry.policy, BackoffShape::Fixed);
    assert_eq!(config.retry.max_attempts, Some(10));
    assert_eq!(config.retry.wait_ms, 60_000);
}

/// **VALUE**: Absent keys default individually; an explicit `null` budget
/// means "retry forever".
#[test]
fn given_partial_config_when_loaded_then_fills_missing_fields() {
    // GIVEN: A file setting only a few fields
    let dir = tempdir().unwrap();
    write(
        dir.path().join("config.json"),
        r#"{ "no_launch": true, "retry": { "policy": "linear", "max_attempts": null, "step_ms": 250 } }"#,
    )
    .unwrap();

    // WHEN: Loading
    let config = ClientConfig::load(dir.path()).unwrap();

    // THEN: Given values win, the rest defaults
    assert!(config.no_launch);
    assert!(!config.debug);
    assert_eq!(config.retry.policy, BackoffShape::Linear);
    assert_eq!(config.retry.max_attempts, None);
    assert_eq!(config.retry.step_ms, 250);
    assert_eq!(config.retry.wait_ms, 60_000);
    assert_eq!(config.launch.debug_env.name, "EDH_LOG_LEVEL");
}

#[test]
fn given_corrupt_config_when_loaded_then_returns_parse_error() {
    let dir = tempdir().unwrap();
    write(dir.path().join("config.json"), "{ not json").unwrap();

    let result = ClientConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_zero_attempt_budget_when_validated_then_rejected() {
    let mut config = ClientConfig::default();
    config.retry.max_attempts = Some(0);

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
fn given_empty_launch_command_when_validated_then_rejected() {
    let mut config = ClientConfig::default();
    config.launch.debug.clear();

    let err = config.validate().unwrap_err();

    assert!(err.to_string().contains("launch commands cannot be empty"));
}

#[test]
fn given_launch_config_when_mode_selected_then_returns_matching_argv() {
    let config = ClientConfig::default();

    assert_eq!(config.launch.command(false), ["/usr/bin/env", "epm", "x", "els"]);
    assert_eq!(config.launch.command(true), ["/usr/bin/env", "stack", "run", "els"]);
}
