//! Metrics collection for depth, fill and reconciliation paths.
//!
//! Uses the `metrics` crate facade. Nothing is exported unless the host
//! installs a recorder (the binary can install a Prometheus exporter).

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;
use tracing::debug;

/// Deltas applied to a live collection.
pub const METRIC_DELTAS_APPLIED: &str = "ladder_deltas_applied_total";
/// Push events dropped before reaching a collection.
pub const METRIC_DELTAS_DROPPED: &str = "ladder_deltas_dropped_total";
/// Book snapshots discarded as malformed.
pub const METRIC_BOOKS_DISCARDED: &str = "ladder_books_discarded_total";
/// Depth transform latency.
pub const METRIC_DEPTH_TRANSFORM_LATENCY: &str = "ladder_depth_transform_ms";
/// Snapshot fetch latency.
pub const METRIC_SNAPSHOT_FETCH_LATENCY: &str = "ladder_snapshot_fetch_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(
        METRIC_DELTAS_APPLIED,
        "Deltas applied to live collections, by entity and outcome"
    );
    describe_counter!(
        METRIC_DELTAS_DROPPED,
        "Push events dropped before reconciliation, by reason"
    );
    describe_counter!(
        METRIC_BOOKS_DISCARDED,
        "Book snapshots discarded as malformed"
    );
    describe_histogram!(
        METRIC_DEPTH_TRANSFORM_LATENCY,
        "Book to depth view transform latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SNAPSHOT_FETCH_LATENCY,
        "REST snapshot fetch latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Count a delta applied to a collection.
pub fn inc_delta_applied(entity: &'static str, outcome: &'static str) {
    counter!(METRIC_DELTAS_APPLIED, "entity" => entity, "outcome" => outcome).increment(1);
}

/// Count a dropped push event.
pub fn inc_delta_dropped(reason: &'static str) {
    counter!(METRIC_DELTAS_DROPPED, "reason" => reason).increment(1);
}

/// Count a discarded book snapshot.
pub fn inc_book_discarded() {
    counter!(METRIC_BOOKS_DISCARDED).increment(1);
}

/// Record snapshot fetch latency.
pub fn record_snapshot_fetch_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SNAPSHOT_FETCH_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for the depth transform.
pub fn timer_depth_transform() -> LatencyTimer {
    LatencyTimer::new(METRIC_DEPTH_TRANSFORM_LATENCY)
}
