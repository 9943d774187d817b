//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//!
//! 1. **Compiled defaults**
//! 2. **Config file**: TOML file named by `CREST_CONFIG` (default `config/config.toml`, optional)
//! 3. **Environment variables**: `CREST__SECTION__FIELD`, e.g. `CREST__POLLER__INTERVAL_MS=500`.
//!    `CREST__UPSTREAMS__ENDPOINTS` takes a comma-separated list.
//! 4. **Command line flags**, applied by the server binary
//!
//! Configuration is fixed for the lifetime of the process.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 8545
//!
//! [upstreams]
//! endpoints = ["http://geth-0:8545", "https://rpc.example.com/v1/key"]
//!
//! [health]
//! healthy_duration_seconds = 60
//! ```

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, path::Path, time::Duration};
use thiserror::Error;

use crate::upstream::{Destination, PollerSettings};

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No upstream RPC endpoints configured")]
    EmptyUpstreams,

    #[error("Invalid upstream address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Unsupported scheme '{scheme}' for upstream {address}, expected http or https")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("Primary upstream {0} is not in the upstream list")]
    UnknownPrimary(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Proxy listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Defaults to `80`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Largest request body accepted for proxying. Defaults to 10 MiB.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Time allowed for in-flight requests after a shutdown signal. Defaults to `3`.
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    80
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_shutdown_grace_seconds() -> u64 {
    3
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
        }
    }
}

/// The upstream nodes, in priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamsConfig {
    /// `http://` or `https://` URLs. Order decides best-set order and the default primary.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Time between polling cycles. Defaults to `1000`.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Deadline for all head fetches of one cycle. Defaults to `2000`.
    #[serde(default = "default_cycle_timeout_ms")]
    pub cycle_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_cycle_timeout_ms() -> u64 {
    2000
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            cycle_timeout_ms: default_cycle_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadsConfig {
    /// How long a fetched head is reused before the node is asked again. Defaults to `1000`.
    #[serde(default = "default_freshness_window_ms")]
    pub freshness_window_ms: u64,

    /// Length of one block timestamp unit. `1000` for chains reporting seconds.
    #[serde(default = "default_block_time_unit_ms")]
    pub block_time_unit_ms: u64,
}

fn default_freshness_window_ms() -> u64 {
    1000
}

fn default_block_time_unit_ms() -> u64 {
    1000
}

impl Default for HeadsConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: default_freshness_window_ms(),
            block_time_unit_ms: default_block_time_unit_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Readiness fails once the primary's head block is this old. Defaults to `60`.
    #[serde(default = "default_healthy_duration_seconds")]
    pub healthy_duration_seconds: u64,

    /// Deadline for the head fetch behind a health probe. Defaults to `2000`.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Upstream the probes are based on. Defaults to the first endpoint.
    #[serde(default)]
    pub primary_upstream: Option<String>,
}

fn default_healthy_duration_seconds() -> u64 {
    60
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            healthy_duration_seconds: default_healthy_duration_seconds(),
            probe_timeout_ms: default_probe_timeout_ms(),
            primary_upstream: None,
        }
    }
}

/// Prometheus endpoint, served on its own listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

fn default_true() -> bool {
    true
}

fn default_prometheus_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"pretty"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstreams: UpstreamsConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub heads: HeadsConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with `CREST__` environment overrides.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Load`] if the file cannot be parsed or a value has the
    /// wrong type.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigurationError> {
        let config = Config::builder()
            .set_default("server.bind_address", "0.0.0.0")?
            .set_default("server.bind_port", 80)?
            .set_default("poller.interval_ms", 1000)?
            .set_default("poller.cycle_timeout_ms", 2000)?
            .set_default("heads.freshness_window_ms", 1000)?
            .set_default("heads.block_time_unit_ms", 1000)?
            .set_default("health.healthy_duration_seconds", 60)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.prometheus_port", 9090)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("CREST")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("upstreams.endpoints"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads from `CREST_CONFIG`, or `config/config.toml` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Load`] if the configuration cannot be loaded.
    pub fn load() -> Result<Self, ConfigurationError> {
        let config_path =
            std::env::var("CREST_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Checks everything that would otherwise fail later at startup.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: no upstreams, an unparseable or non-HTTP upstream,
    /// a duplicate upstream, an unknown primary, a zero duration, or an unknown log format.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.upstreams.endpoints.is_empty() {
            return Err(ConfigurationError::EmptyUpstreams);
        }

        let mut seen = HashSet::new();
        for endpoint in &self.upstreams.endpoints {
            Destination::parse(endpoint)?;
            if !seen.insert(endpoint.as_str()) {
                return Err(ConfigurationError::Invalid(format!(
                    "upstream {endpoint} is listed more than once"
                )));
            }
        }

        if let Some(primary) = &self.health.primary_upstream {
            if !seen.contains(primary.as_str()) {
                return Err(ConfigurationError::UnknownPrimary(primary.clone()));
            }
        }

        for (name, value) in [
            ("poller.interval_ms", self.poller.interval_ms),
            ("poller.cycle_timeout_ms", self.poller.cycle_timeout_ms),
            ("heads.block_time_unit_ms", self.heads.block_time_unit_ms),
            ("health.healthy_duration_seconds", self.health.healthy_duration_seconds),
            ("health.probe_timeout_ms", self.health.probe_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::Invalid(format!("{name} must be greater than 0")));
            }
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigurationError::Invalid(
                "server.max_body_bytes must be greater than 0".to_string(),
            ));
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(ConfigurationError::Invalid(
                "logging.format must be 'json' or 'pretty'".to_string(),
            ));
        }

        self.socket_addr()?;
        if self.metrics.enabled {
            self.metrics_socket_addr()?;
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] if address and port do not form a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigurationError> {
        parse_socket_addr(&self.server.bind_address, self.server.bind_port)
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] if address and port do not form a socket address.
    pub fn metrics_socket_addr(&self) -> Result<SocketAddr, ConfigurationError> {
        parse_socket_addr(&self.metrics.bind_address, self.metrics.prometheus_port)
    }

    #[must_use]
    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.poller.interval_ms),
            cycle_timeout: Duration::from_millis(self.poller.cycle_timeout_ms),
            block_time_unit: self.block_time_unit(),
        }
    }

    #[must_use]
    pub fn freshness_window(&self) -> Duration {
        Duration::from_millis(self.heads.freshness_window_ms)
    }

    #[must_use]
    pub fn block_time_unit(&self) -> Duration {
        Duration::from_millis(self.heads.block_time_unit_ms)
    }

    #[must_use]
    pub fn healthy_duration(&self) -> Duration {
        Duration::from_secs(self.health.healthy_duration_seconds)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health.probe_timeout_ms)
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_seconds)
    }
}

fn parse_socket_addr(address: &str, port: u16) -> Result<SocketAddr, ConfigurationError> {
    let host = if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]")
    } else {
        address.to_string()
    };
    format!("{host}:{port}")
        .parse()
        .map_err(|_| ConfigurationError::Invalid(format!("invalid socket address {address}:{port}")))
}

/// Splits a comma-separated upstream list, trimming entries and dropping blanks.
#[must_use]
pub fn parse_upstream_list(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string).collect()
}
