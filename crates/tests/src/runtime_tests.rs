//! Runtime lifecycle with the background poller running against mock nodes.

use crest_core::{
    config::ConfigurationError,
    runtime::{CrestRuntime, RuntimeError},
};
use tokio::time::{sleep, timeout, Duration};

use crate::mock_infrastructure::{test_config, unix_now, RpcMockBuilder};

#[tokio::test]
async fn test_background_poller_converges_and_stops() {
    let mut behind = RpcMockBuilder::new().await;
    let mut ahead = RpcMockBuilder::new().await;
    behind.mock_latest_block(10, unix_now());
    ahead.mock_latest_block(12, unix_now());
    let urls = [behind.url(), ahead.url()];
    let runtime =
        CrestRuntime::builder().with_config(test_config(&urls)).enable_poller().build().unwrap();

    let publisher = runtime.components().publisher().clone();
    timeout(Duration::from_secs(5), async {
        while publisher.current().generation() == 0 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("first cycle should publish");

    let best = publisher.current();
    assert_eq!(best.member_ids(), vec![urls[1].as_str()]);
    assert_eq!(best.block_number(), Some(12));

    timeout(Duration::from_secs(5), runtime.shutdown()).await.expect("shutdown should finish");
}

#[tokio::test]
async fn test_shutdown_notifies_every_receiver() {
    let node = RpcMockBuilder::new().await;
    let runtime = CrestRuntime::builder()
        .with_config(test_config(&[node.url()]))
        .enable_poller()
        .build()
        .unwrap();
    let mut receivers: Vec<_> = (0..3).map(|_| runtime.shutdown_receiver()).collect();

    timeout(Duration::from_secs(5), runtime.shutdown()).await.unwrap();

    for rx in &mut receivers {
        assert!(rx.recv().await.is_ok());
    }
}

#[tokio::test]
async fn test_poller_disabled_keeps_initial_set() {
    let mut node = RpcMockBuilder::new().await;
    let head = node.expect_latest_block(1, unix_now(), 0);
    let runtime = CrestRuntime::builder().with_config(test_config(&[node.url()])).build().unwrap();

    sleep(Duration::from_millis(300)).await;

    assert_eq!(runtime.components().publisher().current().generation(), 0);
    head.assert_async().await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_build_rejects_bad_upstreams() {
    let bad_scheme = CrestRuntime::builder()
        .with_config(test_config(&["ftp://node:21".to_string()]))
        .build();
    let not_a_url =
        CrestRuntime::builder().with_config(test_config(&["node:8545".to_string()])).build();

    assert!(matches!(
        bad_scheme,
        Err(RuntimeError::ConfigValidation(ConfigurationError::UnsupportedScheme { .. }))
    ));
    assert!(matches!(
        not_a_url,
        Err(RuntimeError::ConfigValidation(
            ConfigurationError::InvalidAddress { .. } | ConfigurationError::UnsupportedScheme { .. }
        ))
    ));
}
