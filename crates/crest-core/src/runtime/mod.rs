//! Runtime assembly and lifecycle.
//!
//! [`CrestRuntime`] wires the registry, best-set publisher, router, proxy engine and
//! health reporter together from an [`AppConfig`](crate::config::AppConfig), and owns
//! the background head poller.
//!
//! ```no_run
//! use crest_core::{config::AppConfig, runtime::CrestRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!
//!     let runtime = CrestRuntime::builder().with_config(config).build()?;
//!
//!     let engine = runtime.proxy_engine();
//!     // ... serve requests through `engine` ...
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod components;
pub mod lifecycle;

pub use builder::{CrestRuntimeBuilder, RuntimeError};
pub use components::CrestComponents;
pub use lifecycle::CrestRuntime;
