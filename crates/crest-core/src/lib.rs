//! # Crest Core
//!
//! Block-height-aware routing for Ethereum JSON-RPC nodes.
//!
//! Crest fronts a fixed set of upstream nodes with a single address and sends each
//! request to one of the nodes currently at the highest observed block.
//!
//! ## Modules
//!
//! - [`config`]: Layered configuration (defaults, TOML file, environment)
//! - [`upstream`]: Registry, head tracking, polling, best-set publication, routing, health
//! - [`proxy`]: Destination rewrite and per-scheme transports
//! - [`metrics`]: Prometheus gauges and counters
//! - [`runtime`]: Component assembly and background task lifecycle
//! - [`utils`]: Hex quantity parsing
//!
//! ## Data Flow
//!
//! ```text
//! Poller ──► HeadTracker (per upstream) ──► BestSetPublisher ──► UpstreamRouter ──► Transport
//!                  │
//!                  └──► HealthReporter (primary upstream)
//! ```

pub mod config;
pub mod metrics;
pub mod proxy;
pub mod runtime;
pub mod upstream;
pub mod utils;
