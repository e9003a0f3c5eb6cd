//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Remedia server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Core conversion metrics re-registered from remedia-core

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "remedia_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("remedia_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "remedia_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Core metrics (conversions, jobs, scheduler, storage sweeps)
    for metric in remedia_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/jobs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/files/12345/metadata";
        assert_eq!(normalize_path(path), "/api/v1/files/{id}/metadata");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("remedia_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_includes_core_metrics() {
        remedia_core::metrics::CONVERSIONS_TOTAL
            .with_label_values(&["sync", "success"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("remedia_conversions_total"));
    }
}
