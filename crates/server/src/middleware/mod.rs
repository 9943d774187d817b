//! HTTP middleware for the proxy listener.

pub mod access_log;
pub mod request_id;

pub use access_log::access_log;
pub use request_id::{create_request_id_layers, request_id, UuidRequestIdGenerator, X_REQUEST_ID};
