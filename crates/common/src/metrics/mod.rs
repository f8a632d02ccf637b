//! Metrics and observability utilities
//!
//! Prometheus metrics for the catalog API with standardized naming.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Bookshelf metrics
pub const METRICS_PREFIX: &str = "bookshelf";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
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

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of catalog searches"
    );

    describe_histogram!(
        format!("{}_search_results", METRICS_PREFIX),
        Unit::Count,
        "Number of books returned by a search"
    );

    describe_counter!(
        format!("{}_status_changes_total", METRICS_PREFIX),
        Unit::Count,
        "Reading status changes by new status"
    );

    describe_counter!(
        format!("{}_ratings_total", METRICS_PREFIX),
        Unit::Count,
        "Ratings and reviews written"
    );

    describe_counter!(
        format!("{}_registrations_total", METRICS_PREFIX),
        Unit::Count,
        "Accounts created"
    );

    describe_counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        Unit::Count,
        "Login attempts by outcome"
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

/// Record a keyword search
pub fn record_search(result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_search_results", METRICS_PREFIX)).record(result_count as f64);
}

/// Record a reading status change
pub fn record_status_change(status: &str) {
    counter!(
        format!("{}_status_changes_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a rating or review; `kind` is "rating" or "review"
pub fn record_opinion(kind: &'static str) {
    counter!(format!("{}_ratings_total", METRICS_PREFIX), "kind" => kind).increment(1);
}

/// Record a new account
pub fn record_registration(is_staff: bool) {
    counter!(
        format!("{}_registrations_total", METRICS_PREFIX),
        "staff" => is_staff.to_string()
    )
    .increment(1);
}

/// Record a login attempt
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(format!("{}_logins_total", METRICS_PREFIX), "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_are_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every call is a no-op
        let metrics = RequestMetrics::start("GET", "/api/books");
        metrics.finish(200);
        record_search(3);
        record_status_change("read");
        record_opinion("rating");
        record_registration(false);
        record_login(true);
    }
}
