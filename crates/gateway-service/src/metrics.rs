//! Prometheus metrics for the Gateway (spec §9.3).

use metrics::counter;

pub fn record_http_request(outcome: &'static str) {
    counter!("gateway_http_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_rpc_request(outcome: &'static str) {
    counter!("gateway_rpc_requests_total", "outcome" => outcome).increment(1);
}
