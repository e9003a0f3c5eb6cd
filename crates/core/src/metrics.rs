//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (counts, durations, rejections)
//! - The job queue (enqueues, state transitions, recoveries)
//! - Storage cleanup sweeps

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by mode and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("remedia_conversions_total", "Total conversions"),
        &["mode", "result"], // mode: "sync", "queued"; result: "success", "failed"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "remedia_conversion_duration_seconds",
            "Duration of conversions",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &["mode"],
    )
    .unwrap()
});

/// Requests rejected during normalization or resolution.
pub static REQUESTS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "remedia_requests_rejected_total",
            "Requests rejected before execution",
        ),
        &["reason"], // "invalid_parameter", "not_found"
    )
    .unwrap()
});

// =============================================================================
// Job Queue Metrics
// =============================================================================

/// Jobs enqueued total.
pub static JOBS_ENQUEUED: Lazy<IntCounter> =
    Lazy::new(|| IntCounter::new("remedia_jobs_enqueued_total", "Total jobs enqueued").unwrap());

/// Job state transitions by target state.
pub static JOB_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("remedia_job_transitions_total", "Job state transitions"),
        &["to"], // "active", "completed", "failed"
    )
    .unwrap()
});

/// Jobs re-queued at startup after an interrupted run.
pub static JOBS_RECOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "remedia_jobs_recovered_total",
        "Jobs re-queued after an interrupted run",
    )
    .unwrap()
});

/// Currently active workers.
pub static ACTIVE_WORKERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "remedia_active_workers",
        "Workers currently executing a job",
    )
    .unwrap()
});

// =============================================================================
// Storage Metrics
// =============================================================================

/// Expired output files removed by the cleanup sweep.
pub static FILES_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "remedia_files_swept_total",
        "Expired output files removed by cleanup",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Conversions
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(REQUESTS_REJECTED.clone()),
        // Job queue
        Box::new(JOBS_ENQUEUED.clone()),
        Box::new(JOB_TRANSITIONS.clone()),
        Box::new(JOBS_RECOVERED.clone()),
        Box::new(ACTIVE_WORKERS.clone()),
        // Storage
        Box::new(FILES_SWEPT.clone()),
    ]
}
