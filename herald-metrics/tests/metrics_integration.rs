//! Integration tests for dispatcher metrics collection

#![allow(clippy::expect_used)]

use herald_metrics::{DispatchMetrics, MetricsConfig};

#[test]
fn test_queue_state_is_published_for_the_gauge() {
    let metrics = DispatchMetrics::new().expect("Failed to create dispatch metrics");

    metrics.set_queue_state(25, 2, 0);
    assert_eq!(metrics.queued(), 25);
    assert_eq!(metrics.in_flight(), 2);
    assert_eq!(metrics.retrying(), 0);

    // Later observations overwrite rather than accumulate
    metrics.set_queue_state(5, 1, 3);
    assert_eq!(metrics.queued(), 5);
    assert_eq!(metrics.in_flight(), 1);
    assert_eq!(metrics.retrying(), 3);
}

#[test]
fn test_event_recording_does_not_require_an_exporter() {
    let metrics = DispatchMetrics::new().expect("Failed to create dispatch metrics");

    // With no provider installed the global meter is a no-op; recording must
    // still be safe so the dispatcher can call it unconditionally.
    metrics.record_batch(10, 0.25);
    metrics.record_sent(1);
    metrics.record_sent(3);
    metrics.record_failed("exhausted");
    metrics.record_retry();
}

#[test]
fn test_disabled_config_is_a_no_op() {
    let config = MetricsConfig::default();
    assert!(!config.enabled);

    herald_metrics::init_metrics(&config).expect("disabled metrics never fail");
    assert!(!herald_metrics::is_enabled());
    assert!(herald_metrics::metrics().is_none());
    herald_metrics::shutdown().expect("shutdown without init is a no-op");
}

#[test]
fn test_config_from_ron() {
    let config: MetricsConfig =
        ron::from_str("(enabled: true)").expect("metrics config should parse");

    assert!(config.enabled);
    assert_eq!(config.endpoint, "http://localhost:4318/v1/metrics");
}
