use clap::{Parser, ValueEnum};
use crest_core::config::{parse_upstream_list, AppConfig, ConfigurationError};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

/// Command line flags. Each one given overrides the file and environment value.
#[derive(Debug, Default, Parser)]
#[command(name = "crest", version, about = "Block-height-aware JSON-RPC load balancer")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, env = "CREST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Proxy listen address, `host:port` or `:port`
    #[arg(long)]
    pub addr: Option<String>,

    /// Comma-separated upstream URLs, in priority order
    #[arg(long)]
    pub upstream: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Args {
    /// Loads the file and environment layers, then applies the flags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if loading fails or `--addr` is malformed.
    pub fn load_config(&self) -> Result<AppConfig, ConfigurationError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::load()?,
        };
        self.apply_to(&mut config)?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::Invalid`] if `--addr` is not `host:port` or `:port`.
    pub fn apply_to(&self, config: &mut AppConfig) -> Result<(), ConfigurationError> {
        if let Some(addr) = &self.addr {
            let (host, port) = split_addr(addr)?;
            config.server.bind_address = host;
            config.server.bind_port = port;
        }
        if let Some(list) = &self.upstream {
            config.upstreams.endpoints = parse_upstream_list(list);
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.as_str().to_string();
        }
        Ok(())
    }
}

fn split_addr(addr: &str) -> Result<(String, u16), ConfigurationError> {
    let invalid = || ConfigurationError::Invalid(format!("invalid listen address {addr}"));

    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse().map_err(|_| invalid())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = if host.is_empty() { "0.0.0.0" } else { host };

    Ok((host.to_string(), port))
}
