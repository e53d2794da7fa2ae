//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all PolicyDesk metrics
pub const METRICS_PREFIX: &str = "policydesk";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for vendor calls (telephony round trips are slower)
pub const VENDOR_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Entity metrics
    describe_counter!(
        format!("{}_entities_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total entity records created"
    );

    describe_counter!(
        format!("{}_entities_updated_total", METRICS_PREFIX),
        Unit::Count,
        "Total entity records updated"
    );

    describe_counter!(
        format!("{}_entities_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total entity records deleted"
    );

    // Import metrics
    describe_counter!(
        format!("{}_import_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Total CSV rows processed by lead import"
    );

    describe_counter!(
        format!("{}_import_rows_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Total CSV rows skipped by lead import"
    );

    describe_histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Lead import processing latency in seconds"
    );

    // Telephony metrics
    describe_counter!(
        format!("{}_telephony_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total ring-out calls placed"
    );

    describe_counter!(
        format!("{}_telephony_sms_total", METRICS_PREFIX),
        Unit::Count,
        "Total SMS messages sent"
    );

    describe_counter!(
        format!("{}_telephony_reauth_total", METRICS_PREFIX),
        Unit::Count,
        "Total telephony token refresh failures requiring re-authorization"
    );

    // Storage metrics
    describe_counter!(
        format!("{}_storage_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Total document uploads"
    );

    describe_counter!(
        format!("{}_storage_downloads_total", METRICS_PREFIX),
        Unit::Count,
        "Total signed download URLs issued"
    );

    // Database metrics
    describe_gauge!(
        format!("{}_db_connections_active", METRICS_PREFIX),
        Unit::Count,
        "Active database connections"
    );

    describe_histogram!(
        format!("{}_db_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Database query latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record entity mutations
pub fn record_entity_op(entity: &'static str, op: &'static str) {
    let name = match op {
        "create" => format!("{}_entities_created_total", METRICS_PREFIX),
        "update" => format!("{}_entities_updated_total", METRICS_PREFIX),
        _ => format!("{}_entities_deleted_total", METRICS_PREFIX),
    };
    counter!(name, "entity" => entity).increment(1);
}

/// Helper to record a completed import run
pub fn record_import(duration_secs: f64, imported: usize, skipped: usize) {
    counter!(format!("{}_import_rows_total", METRICS_PREFIX)).increment(imported as u64);
    counter!(format!("{}_import_rows_skipped_total", METRICS_PREFIX)).increment(skipped as u64);
    histogram!(format!("{}_import_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // P50 target (50ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.050));
        // P99 target (250ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.250));
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/leads");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
