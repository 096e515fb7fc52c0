//! Metrics collection and Prometheus export.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub const SECURITY_FILTER_APPLIED: &str = "catalog_security_filter_applied_total";
pub const EVENTS_HANDLED: &str = "catalog_events_handled_total";
pub const EVENTS_FAILED: &str = "catalog_events_failed_total";
pub const EVENTS_PUBLISHED: &str = "catalog_events_published_total";
pub const STALE_STREAMS: &str = "catalog_stale_streams";

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// This must be called once at startup before any metrics are recorded.
/// Panics if called more than once.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    describe_counter!(
        SECURITY_FILTER_APPLIED,
        "Reads rewritten to exclude protected rows"
    );
    describe_counter!(EVENTS_HANDLED, "Events processed by a subscription handler");
    describe_counter!(EVENTS_FAILED, "Events whose handler returned an error");
    describe_counter!(EVENTS_PUBLISHED, "Events published to the event channel");
    describe_gauge!(STALE_STREAMS, "Re-scan candidates found by the last staleness run");
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}
