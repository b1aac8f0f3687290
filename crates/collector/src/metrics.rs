use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

pub static FETCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_requests_total",
        "Total number of GraphQL batch requests grouped by operation and outcome",
        &["op", "outcome"]
    )
    .expect("collector fetch requests total")
});

pub static FETCH_ITEMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_items_total",
        "Number of issues and pull requests decoded from batch responses",
        &["op"]
    )
    .expect("collector fetch items total")
});

pub static FETCH_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collector_fetch_latency_seconds",
        "Latency of GraphQL batch requests grouped by operation",
        &["op"],
        vec![0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .expect("collector fetch latency seconds")
});

// Null or foreign-typed entries in a `nodes` response
pub static NODES_SKIPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_nodes_skipped_total",
        "Response nodes dropped before merging grouped by reason",
        &["reason"]
    )
    .expect("collector nodes skipped total")
});

pub static MERGE_MISSING_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_merge_missing_total",
        "Canonical issues left unchanged because no remote item matched"
    )
    .expect("collector merge missing total")
});

/// Text exposition of everything in the default registry.
pub fn render() -> Result<String> {
    Ok(TextEncoder::new().encode_to_string(&prometheus::gather())?)
}
