//! Upstream nodes and block-height-aware selection.
//!
//! - [`registry::UpstreamRegistry`]: the configured nodes, in order
//! - [`head_tracker::HeadTracker`]: per-node head cache with a short freshness window
//! - [`poller::HeadPoller`]: background cycle that polls heads and publishes the best set
//! - [`best_set::BestSetPublisher`]: the atomically replaced best set
//! - [`router::UpstreamRouter`]: round-robin over the best set
//! - [`health::HealthReporter`]: liveness and readiness from the primary node's head

pub mod best_set;
pub mod endpoint;
pub mod errors;
pub mod head_tracker;
pub mod health;
pub mod http_client;
pub mod poller;
pub mod registry;
pub mod router;
pub mod rpc_client;

#[cfg(test)]
pub(crate) mod test_support;

pub use best_set::{BestSet, BestSetPublisher};
pub use endpoint::{Destination, Scheme, Upstream};
pub use errors::{NoUpstreamAvailable, UpstreamError};
pub use head_tracker::{HeadFetchError, HeadSnapshot, HeadTracker};
pub use health::{HealthCheckFailure, HealthReporter};
pub use http_client::{build_http_client, HttpClientConfig};
pub use poller::{select_best, HeadPoller, PollerSettings};
pub use registry::UpstreamRegistry;
pub use router::UpstreamRouter;
pub use rpc_client::{BlockHead, BlockSource, RpcClient};
