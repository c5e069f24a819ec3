mod common;

use common::BridgeCapture;
use crowd_nav::adapters::outbound::{init_buffered_logger, init_noop_logger, MultiLogger};
use crowd_nav::domains::logger::DomainLogger;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_buffered_and_noop_logger() {
    let capture = Arc::new(BridgeCapture::new());
    let bridge = capture.clone() as Arc<dyn DomainLogger>;

    let buffered = init_buffered_logger(bridge.clone(), 8);

    buffered.info("one");
    buffered.warn("two");
    buffered.error("three");

    // Give the background task a moment
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(capture.contains("INFO:one"));
    assert!(capture.contains("WARN:two"));
    assert!(capture.contains("ERR:three"));

    let noop = init_noop_logger();
    noop.info("ignored");
    noop.error("ignored-err");
}

#[test]
fn test_multi_logger_forwards_to_both() {
    let primary = Arc::new(BridgeCapture::new());
    let secondary = Arc::new(BridgeCapture::new());
    let logger = MultiLogger::new(primary.clone(), Some(secondary.clone() as Arc<dyn DomainLogger>));

    logger.warn("replanning");

    assert!(primary.contains("WARN:replanning"));
    assert!(secondary.contains("WARN:replanning"));

    let single = MultiLogger::new(primary.clone(), None);
    single.error("only once");
    assert_eq!(primary.messages.lock().unwrap().len(), 2);
}
