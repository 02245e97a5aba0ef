//! Prometheus metrics for the Normalizer (spec §9.3).

use metrics::counter;

pub fn record_processed(outcome: &'static str) {
    counter!("normalizer_events_processed_total", "outcome" => outcome).increment(1);
}
