//! HTTP front for crest: the proxy listener with its health endpoint, the metrics
//! listener, and the command line.

pub mod app;
pub mod args;
pub mod listeners;
pub mod middleware;
pub mod router;

pub use app::{create_app, create_metrics_app, AppState};
pub use listeners::{bind_listeners, Listeners};
