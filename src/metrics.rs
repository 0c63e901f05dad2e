//! Metrics and telemetry for the trend function cache
//!
//! Prometheus counters for cache traffic, storage round-trips and
//! evaluation outcomes, plus gauges for cache occupancy.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};

lazy_static! {
    // === Cache Counters ===

    /// Cache lookups by outcome
    pub static ref CACHE_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "tfc_cache_requests_total",
        "Trend function cache lookups by result",
        &["result"]
    ).unwrap();

    /// Entries removed from the cache by reason
    pub static ref CACHE_REMOVALS_TOTAL: CounterVec = register_counter_vec!(
        "tfc_cache_removals_total",
        "Trend function cache entries removed by reason",
        &["reason"]
    ).unwrap();

    // === Cache Gauges ===

    /// Slot occupancy, refreshed whenever a cache gains or loses entries
    pub static ref CACHE_SLOTS: GaugeVec = register_gauge_vec!(
        "tfc_cache_slots",
        "Trend function cache slots by state",
        &["state"]
    ).unwrap();

    // === Evaluation ===

    /// Evaluations by function and result state
    pub static ref EVALUATIONS_TOTAL: CounterVec = register_counter_vec!(
        "tfc_evaluations_total",
        "Trend function evaluations by function and result",
        &["function", "state"]
    ).unwrap();

    /// Rollup store query latency
    pub static ref STORE_QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "tfc_store_query_duration_seconds",
        "Rollup store query latency in seconds",
        &["table"],
        vec![0.0001, 0.001, 0.01, 0.1, 1.0]
    ).unwrap();

    /// Errors by type and operation
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "tfc_errors_total",
        "Total errors by type and operation",
        &["error_type", "operation"]
    ).unwrap();
}

/// Initialize metrics system
pub fn init() {
    lazy_static::initialize(&CACHE_REQUESTS_TOTAL);
    lazy_static::initialize(&CACHE_REMOVALS_TOTAL);
    lazy_static::initialize(&CACHE_SLOTS);
    lazy_static::initialize(&EVALUATIONS_TOTAL);
    lazy_static::initialize(&STORE_QUERY_DURATION);
    lazy_static::initialize(&ERRORS_TOTAL);

    tracing::info!("Metrics system initialized");
}

/// Get metrics in Prometheus text format
///
/// # Returns
///
/// Result containing the formatted metrics string, or an error if encoding fails
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a cache lookup
#[inline]
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };

    CACHE_REQUESTS_TOTAL.with_label_values(&[result]).inc();
}

/// Record entries leaving the cache
#[inline]
pub fn record_cache_removal(reason: &str, count: usize) {
    if count > 0 {
        CACHE_REMOVALS_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }
}

/// Update slot occupancy
#[inline]
pub fn update_cache_slots(used: usize, total: usize) {
    CACHE_SLOTS.with_label_values(&["used"]).set(used as f64);
    CACHE_SLOTS
        .with_label_values(&["free"])
        .set(total.saturating_sub(used) as f64);
}

/// Record a finished evaluation
#[inline]
pub fn record_evaluation(function: &str, state: &str) {
    EVALUATIONS_TOTAL.with_label_values(&[function, state]).inc();
}

/// Record a rollup store query
#[inline]
pub fn record_store_query(table: &str, duration_secs: f64) {
    STORE_QUERY_DURATION
        .with_label_values(&[table])
        .observe(duration_secs);
}

/// Record an error
#[inline]
pub fn record_error(error_type: &str, operation: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type, operation]).inc();
}
