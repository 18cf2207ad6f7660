//! Prometheus metrics for the quoting engine.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Engine tick latency metric name.
pub const METRIC_TICK_LATENCY: &str = "engine_tick_latency_ms";
/// Price fetch latency metric name.
pub const METRIC_FEED_LATENCY: &str = "feed_fetch_latency_ms";
/// Quotes submitted counter metric name.
pub const METRIC_QUOTES_SUBMITTED: &str = "quotes_submitted_total";
/// Quote cancels counter metric name.
pub const METRIC_QUOTES_CANCELLED: &str = "quotes_cancelled_total";
/// Rebalances counter metric name.
pub const METRIC_REBALANCES: &str = "rebalances_total";
/// Fills detected counter metric name.
pub const METRIC_FILLS_DETECTED: &str = "fills_detected_total";
/// Circuit breaker trips counter metric name.
pub const METRIC_BREAKER_TRIPS: &str = "circuit_breaker_trips_total";
/// End-of-market pulls counter metric name.
pub const METRIC_ORDER_PULLS: &str = "order_pulls_total";
/// Skipped ticks counter metric name.
pub const METRIC_TICKS_SKIPPED: &str = "ticks_skipped_total";
/// Market rotations counter metric name.
pub const METRIC_MARKET_ROTATIONS: &str = "market_rotations_total";
/// Fair-value gauge metric name.
pub const METRIC_YES_TARGET: &str = "yes_target";

/// Initialize all metric descriptions. Call once at startup.
pub fn init_metrics() {
    describe_histogram!(METRIC_TICK_LATENCY, "Engine tick latency in milliseconds");
    describe_histogram!(METRIC_FEED_LATENCY, "Price fetch latency in milliseconds");

    describe_counter!(METRIC_QUOTES_SUBMITTED, "Total orders submitted");
    describe_counter!(METRIC_QUOTES_CANCELLED, "Total orders cancelled");
    describe_counter!(METRIC_REBALANCES, "Total ladder replacements");
    describe_counter!(METRIC_FILLS_DETECTED, "Total fills detected via reconciliation");
    describe_counter!(METRIC_BREAKER_TRIPS, "Total circuit breaker trips");
    describe_counter!(METRIC_ORDER_PULLS, "Total end-of-market order pulls");
    describe_counter!(METRIC_TICKS_SKIPPED, "Total ticks skipped on transport failures");
    describe_counter!(METRIC_MARKET_ROTATIONS, "Total market rotations observed");

    describe_gauge!(METRIC_YES_TARGET, "Current fair YES probability per asset");

    debug!("Metrics initialized");
}

/// Record engine tick latency.
pub fn record_tick_latency(start: Instant, asset: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_TICK_LATENCY, "asset" => asset.to_string()).record(latency_ms);
}

/// Record price fetch latency.
pub fn record_feed_latency(start: Instant, asset: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FEED_LATENCY, "asset" => asset.to_string()).record(latency_ms);
}

/// Record the current fair value for an asset.
pub fn record_yes_target(asset: &str, yes_target: f64) {
    gauge!(METRIC_YES_TARGET, "asset" => asset.to_string()).set(yes_target);
}

/// Increment quotes submitted by `count`.
pub fn inc_quotes_submitted(count: u64) {
    counter!(METRIC_QUOTES_SUBMITTED).increment(count);
}

/// Increment quotes cancelled by `count`.
pub fn inc_quotes_cancelled(count: u64) {
    counter!(METRIC_QUOTES_CANCELLED).increment(count);
}

/// Increment the rebalance counter.
pub fn inc_rebalances() {
    counter!(METRIC_REBALANCES).increment(1);
}

/// Increment the detected-fill counter.
pub fn inc_fills_detected() {
    counter!(METRIC_FILLS_DETECTED).increment(1);
}

/// Increment the circuit breaker trip counter.
pub fn inc_breaker_trips() {
    counter!(METRIC_BREAKER_TRIPS).increment(1);
}

/// Increment the order pull counter.
pub fn inc_order_pulls() {
    counter!(METRIC_ORDER_PULLS).increment(1);
}

/// Increment the skipped tick counter.
pub fn inc_ticks_skipped() {
    counter!(METRIC_TICKS_SKIPPED).increment(1);
}

/// Increment the market rotation counter.
pub fn inc_market_rotations() {
    counter!(METRIC_MARKET_ROTATIONS).increment(1);
}
