//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Submissions and rejections
//! - Confirmation polling and terminal statuses
//! - Request retries

use crate::error::{ClientError, ClientResult};
use crate::types::TransactionResult;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    // Submission metrics
    pub static ref TX_SUBMITTED: Counter = register_counter!(
        "entry_submitter_transactions_submitted_total",
        "Total transactions accepted by the node"
    ).unwrap();

    pub static ref TX_REJECTED: CounterVec = register_counter_vec!(
        "entry_submitter_transactions_rejected_total",
        "Total submissions rejected by the node",
        &["kind"]
    ).unwrap();

    // Confirmation metrics
    pub static ref TX_OUTCOME: CounterVec = register_counter_vec!(
        "entry_submitter_wait_outcomes_total",
        "Confirmation waits by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref POLLS: Counter = register_counter!(
        "entry_submitter_status_polls_total",
        "Total transaction status queries"
    ).unwrap();

    pub static ref WAIT_LATENCY: HistogramVec = register_histogram_vec!(
        "entry_submitter_wait_seconds",
        "Time spent waiting for confirmation",
        &["outcome"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();

    // Transport metrics
    pub static ref REQUEST_RETRIES: CounterVec = register_counter_vec!(
        "entry_submitter_request_retries_total",
        "Retried node requests by operation",
        &["operation"]
    ).unwrap();
}

/// Text exposition of all registered metrics
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

// Helper functions to record metrics

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_rejection(kind: &str) {
    TX_REJECTED.with_label_values(&[kind]).inc();
}

pub fn record_poll() {
    POLLS.inc();
}

pub fn record_request_retry(operation: &str) {
    REQUEST_RETRIES.with_label_values(&[operation]).inc();
}

pub fn record_wait_outcome(result: &ClientResult<TransactionResult>, waited: Duration) {
    let outcome = match result {
        Ok(r) => r.status.as_str(),
        Err(ClientError::TimedOut { .. }) => "timed_out",
        Err(ClientError::Cancelled { .. }) => "cancelled",
        Err(_) => "error",
    };

    TX_OUTCOME.with_label_values(&[outcome]).inc();
    WAIT_LATENCY
        .with_label_values(&[outcome])
        .observe(waited.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_metrics() {
        record_rejection("rejected");
        record_wait_outcome(
            &Err(ClientError::TimedOut {
                hash: "0x1".to_string(),
            }),
            Duration::from_millis(10),
        );

        let text = render();
        assert!(text.contains("entry_submitter_transactions_rejected_total"));
        assert!(text.contains("outcome=\"timed_out\""));
    }
}
