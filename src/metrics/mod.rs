//! Prometheus metrics for the notification feed.
//!
//! - Push handling outcomes (inserted, duplicate, control, malformed)
//! - Remote sync failures per operation
//! - Push channel reconnect attempts
//! - Active feed sessions

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "adoption_feed";

lazy_static! {
    /// Push channel messages by handling outcome
    pub static ref PUSH_MESSAGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_push_messages_total", METRIC_PREFIX),
        "Push channel messages by handling outcome",
        &["outcome"]
    ).unwrap();

    /// Remote sync calls that failed after the local update was applied
    pub static ref SYNC_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sync_failures_total", METRIC_PREFIX),
        "Remote sync calls that failed",
        &["operation"]
    ).unwrap();

    /// Initial fetches that failed and fell back to an empty feed
    pub static ref INITIAL_LOAD_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_initial_load_failures_total", METRIC_PREFIX),
        "Initial notification fetches that failed"
    ).unwrap();

    /// Push channel reconnect attempts
    pub static ref CHANNEL_RECONNECTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_channel_reconnects_total", METRIC_PREFIX),
        "Push channel reconnect attempts"
    ).unwrap();

    /// Feed sessions currently alive
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_sessions_active", METRIC_PREFIX),
        "Feed sessions currently alive"
    ).unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
