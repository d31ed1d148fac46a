//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{describe_counter, describe_histogram, Unit};

/// Metrics prefix for all SalesForge metrics
pub const METRICS_PREFIX: &str = "salesforge";

/// Histogram buckets for materialization job duration (in seconds)
pub const JOB_DURATION_BUCKETS: &[f64] = &[
    0.010, // 10ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    // ETL metrics
    describe_counter!(
        format!("{}_datasets_processed_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of datasets materialized successfully"
    );

    describe_counter!(
        format!("{}_datasets_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of materialization jobs that failed"
    );

    describe_counter!(
        format!("{}_records_written_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of canonical records persisted"
    );

    describe_counter!(
        format!("{}_rows_dropped_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of duplicate rows dropped during normalization"
    );

    describe_histogram!(
        format!("{}_job_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Materialization job duration in seconds"
    );
}

/// Metric name helper
pub fn name(suffix: &str) -> String {
    format!("{}_{}", METRICS_PREFIX, suffix)
}
