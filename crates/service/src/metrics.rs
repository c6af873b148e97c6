use std::time::Duration;

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec, TextEncoder};

use crate::errors::StorageError;

// Prometheus metrics (default registry)
pub static STORAGE_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "person_storage_operations_total",
        "Storage engine operations by operation and outcome",
        &["op", "outcome"]
    )
    .expect("register person_storage_operations_total")
});

pub static STORAGE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "person_storage_operation_duration_seconds",
        "Time spent inside the storage engine lock, per operation",
        &["op"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register person_storage_operation_duration_seconds")
});

/// Record one finished engine operation.
pub fn observe(op: &'static str, outcome: Result<(), &StorageError>, elapsed: Duration) {
    let outcome = match outcome {
        Ok(()) => "ok",
        Err(e) => e.label(),
    };
    STORAGE_OPERATIONS_TOTAL.with_label_values(&[op, outcome]).inc();
    STORAGE_OPERATION_DURATION.with_label_values(&[op]).observe(elapsed.as_secs_f64());
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
