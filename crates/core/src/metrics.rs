//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download lifecycle (started, completed, failed, canceled, duration)
//! - Process supervision (spawn failures, parsed progress samples)
//! - Format probing (requests by result, duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Download Metrics
// =============================================================================

/// Downloads started total.
pub static DOWNLOADS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mediamine_downloads_started_total", "Total downloads started").unwrap()
});

/// Downloads completed total.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamine_downloads_completed_total",
        "Total downloads completed successfully",
    )
    .unwrap()
});

/// Downloads failed total.
pub static DOWNLOADS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamine_downloads_failed_total",
        "Total downloads that failed",
    )
    .unwrap()
});

/// Downloads canceled total.
pub static DOWNLOADS_CANCELED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamine_downloads_canceled_total",
        "Total downloads canceled",
    )
    .unwrap()
});

/// Download duration in seconds, from process start to terminal state.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("mediamine_download_duration_seconds", "Duration of downloads").buckets(
            vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0],
        ),
        &["result"], // "completed", "error", "canceled"
    )
    .unwrap()
});

// =============================================================================
// Process Metrics
// =============================================================================

/// Downloader processes that could not be started.
pub static SPAWN_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamine_spawn_failures_total",
        "Total downloader processes that failed to start",
    )
    .unwrap()
});

/// Progress samples parsed from downloader output.
pub static PROGRESS_SAMPLES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediamine_progress_samples_total",
        "Total progress samples parsed from downloader output",
    )
    .unwrap()
});

// =============================================================================
// Format Probe Metrics
// =============================================================================

/// Format probe requests by result.
pub static PROBE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediamine_probe_requests_total", "Total format probe requests"),
        &["result"], // "success", "no_formats", "timeout", "error"
    )
    .unwrap()
});

/// Format probe duration in seconds.
pub static PROBE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediamine_probe_duration_seconds",
            "Duration of format probes",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Downloads
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOADS_FAILED.clone()),
        Box::new(DOWNLOADS_CANCELED.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        // Process
        Box::new(SPAWN_FAILURES.clone()),
        Box::new(PROGRESS_SAMPLES.clone()),
        // Probing
        Box::new(PROBE_REQUESTS.clone()),
        Box::new(PROBE_DURATION.clone()),
    ]
}
