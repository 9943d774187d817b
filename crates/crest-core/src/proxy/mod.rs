//! Outbound forwarding of client requests to the selected upstream.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌──────────────────┐
//! │  UpstreamRouter  │ ─── empty best set ──► 503
//! └────────┬─────────┘
//!          │ upstream
//!          ▼
//! ┌──────────────────┐
//! │ Destination      │  scheme, host, base path + request path, Host header
//! │ rewrite          │
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Transport        │ ─── network failure ──► 502
//! │ (http | https)   │
//! └────────┬─────────┘
//!          ▼
//!   Upstream Response
//! ```
//!
//! Bodies are buffered in both directions; JSON-RPC payloads are bounded by the
//! server's body limit.

pub mod engine;
pub mod errors;
pub mod headers;
pub mod transport;

pub use engine::ProxyEngine;
pub use errors::ProxyError;
pub use transport::{HttpTransport, Transport, TransportSet};
