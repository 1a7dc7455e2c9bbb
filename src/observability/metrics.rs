//! Metrics collection.
//!
//! # Metrics
//! - `hive_rpc_attempts_total` (counter): node attempts by node, outcome
//! - `hive_rpc_duration_seconds` (histogram): latency per method
//! - `hive_broadcast_total` (counter): orchestrator results by stage, outcome
//! - `hive_signature_retries_total` (counter): non-canonical signatures discarded
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The embedding application chooses the exporter

use std::time::Instant;

/// Record the outcome of one attempt against one node.
pub fn record_rpc_attempt(node: &str, outcome: &'static str) {
    metrics::counter!(
        "hive_rpc_attempts_total",
        "node" => node.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how long a full call (all nodes) took.
pub fn record_rpc_duration(method: &str, start: Instant) {
    metrics::histogram!("hive_rpc_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record where a broadcast finished.
pub fn record_broadcast(stage: &'static str, outcome: &'static str) {
    metrics::counter!("hive_broadcast_total", "stage" => stage, "outcome" => outcome)
        .increment(1);
}

/// Record discarded non-canonical signatures.
pub fn record_signature_retries(count: u64) {
    if count > 0 {
        metrics::counter!("hive_signature_retries_total").increment(count);
    }
}
