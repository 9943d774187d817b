//! Mock JSON-RPC nodes and fixtures for the integration tests.
//!
//! ```ignore
//! use tests::mock_infrastructure::RpcMockBuilder;
//!
//! let mut node = RpcMockBuilder::new().await;
//! node.mock_latest_block(100, unix_now());
//!
//! // Use node.url() as an upstream address
//! ```

pub mod rpc_mock;
pub mod test_helpers;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
