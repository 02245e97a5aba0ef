//! Scorer metrics definitions (spec §9.2).

use metrics::counter;

/// Record an RPC outcome.
///
/// Metric: `scorer_rpc_requests_total`
/// Labels: `method`, `status`
pub fn record_rpc(method: &str, status: &str) {
    counter!("scorer_rpc_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
}
