//! Integration tests for crest.
//!
//! - `poller_tests`: head polling against mock nodes and how the best set steers routing
//! - `proxy_tests`: forwarding through the axum app (rewrite, round robin, error mapping)
//! - `health_endpoint_tests`: `/healthz` liveness and readiness
//! - `config_tests`: defaults, TOML file and environment layering
//! - `runtime_tests`: builder validation and background poller lifecycle
//! - `mock_infrastructure`: mockito-backed JSON-RPC nodes and fixtures
//!
//! ```bash
//! cargo test --package tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]


#[cfg(test)]
mod proxy_tests;


#[cfg(test)]
mod config_tests;

#[cfg(test)]
mod runtime_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
