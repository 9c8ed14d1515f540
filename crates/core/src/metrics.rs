//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Poll loop (cycles, lots, seen-set persistence)
//! - Lot sources (fetches by backend)
//! - Delivery (chat and email) and document rendering

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Poll Loop Metrics
// =============================================================================

/// Poll cycles by result.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bankrot_poll_cycles_total", "Total poll cycles"),
        &["result"], // "ok", "source_unavailable"
    )
    .unwrap()
});

/// Poll cycle duration in seconds.
pub static CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bankrot_poll_cycle_duration_seconds",
            "Duration of one poll cycle",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Candidate lots by outcome.
pub static LOTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bankrot_lots_total", "Candidate lots handled by the poll loop"),
        &["outcome"], // "dispatched", "failed", "skipped_seen"
    )
    .unwrap()
});

/// Number of ids in the seen set.
pub static SEEN_LOTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("bankrot_seen_lots", "Lot ids in the seen set").unwrap()
});

/// Seen-set saves by result.
pub static STORE_SAVES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bankrot_seen_store_saves_total", "Seen-set file writes"),
        &["result"], // "ok", "error"
    )
    .unwrap()
});

// =============================================================================
// Source Metrics
// =============================================================================

/// Per-entity source fetches.
pub static SOURCE_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bankrot_source_fetches_total", "Lot source listing requests"),
        &["source", "result"], // result: "ok", "error"
    )
    .unwrap()
});

/// Candidates returned per fetch.
pub static CANDIDATES_FOUND: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bankrot_candidates_found",
            "Number of candidate lots returned per fetch",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Delivery Metrics
// =============================================================================

/// Deliveries by channel and result.
pub static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bankrot_deliveries_total", "Notification deliveries"),
        &["channel", "result"], // result: "ok", "error"
    )
    .unwrap()
});

/// Document renders by result.
pub static RENDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bankrot_renders_total", "Application documents rendered"),
        &["result"],
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Poll loop
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(CYCLE_DURATION.clone()),
        Box::new(LOTS_TOTAL.clone()),
        Box::new(SEEN_LOTS.clone()),
        Box::new(STORE_SAVES.clone()),
        // Sources
        Box::new(SOURCE_FETCHES.clone()),
        Box::new(CANDIDATES_FOUND.clone()),
        // Delivery
        Box::new(DELIVERIES_TOTAL.clone()),
        Box::new(RENDERS_TOTAL.clone()),
    ]
}
