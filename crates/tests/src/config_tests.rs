//! Layered configuration: defaults, TOML file and `CREST__*` environment.

use crest_core::config::{AppConfig, ConfigurationError};
use serial_test::serial;
use std::{path::PathBuf, time::Duration};

const ENV_KEYS: [&str; 4] = [
    "CREST__UPSTREAMS__ENDPOINTS",
    "CREST__POLLER__INTERVAL_MS",
    "CREST__HEADS__BLOCK_TIME_UNIT_MS",
    "CREST__HEALTH__PRIMARY_UPSTREAM",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn missing_file() -> PathBuf {
    std::env::temp_dir().join("crest-config-does-not-exist.toml")
}

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("crest-{name}-{}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
#[serial]
fn test_defaults_without_file_or_env() {
    clear_env();

    let config = AppConfig::from_file(missing_file()).unwrap();

    assert_eq!(config.server.bind_port, 80);
    assert_eq!(config.poller_settings().interval, Duration::from_secs(1));
    assert_eq!(config.poller_settings().cycle_timeout, Duration::from_secs(2));
    assert_eq!(config.healthy_duration(), Duration::from_secs(60));
    assert!(matches!(config.validate(), Err(ConfigurationError::EmptyUpstreams)));
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    std::env::set_var("CREST__UPSTREAMS__ENDPOINTS", "http://a:8545,https://b.example.com/key");
    std::env::set_var("CREST__POLLER__INTERVAL_MS", "250");
    std::env::set_var("CREST__HEALTH__PRIMARY_UPSTREAM", "https://b.example.com/key");

    let config = AppConfig::from_file(missing_file());
    clear_env();
    let config = config.unwrap();

    assert_eq!(
        config.upstreams.endpoints,
        vec!["http://a:8545".to_string(), "https://b.example.com/key".to_string()]
    );
    assert_eq!(config.poller_settings().interval, Duration::from_millis(250));
    assert_eq!(config.health.primary_upstream.as_deref(), Some("https://b.example.com/key"));
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_file_layer_with_env_on_top() {
    clear_env();
    let path = write_config(
        "layered",
        r#"
[upstreams]
endpoints = ["http://node-1:8545", "http://node-2:8545"]

[heads]
block_time_unit_ms = 1
freshness_window_ms = 250

[logging]
format = "json"
"#,
    );
    std::env::set_var("CREST__HEADS__BLOCK_TIME_UNIT_MS", "1000");

    let config = AppConfig::from_file(&path);
    clear_env();
    std::fs::remove_file(&path).ok();
    let config = config.unwrap();

    assert_eq!(config.upstreams.endpoints.len(), 2);
    assert_eq!(config.block_time_unit(), Duration::from_secs(1));
    assert_eq!(config.freshness_window(), Duration::from_millis(250));
    assert_eq!(config.logging.format, "json");
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_file_with_unsupported_scheme_fails_validation() {
    clear_env();
    let path = write_config(
        "scheme",
        r#"
[upstreams]
endpoints = ["ws://node-1:8546"]
"#,
    );

    let config = AppConfig::from_file(&path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(
        config.unwrap().validate(),
        Err(ConfigurationError::UnsupportedScheme { .. })
    ));
}
