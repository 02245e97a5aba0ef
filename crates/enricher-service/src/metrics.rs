//! Prometheus metrics for the Enricher (spec §9.3).

use metrics::counter;

pub fn record_processed(outcome: &'static str) {
    counter!("enricher_events_processed_total", "outcome" => outcome).increment(1);
}

pub fn record_orphan() {
    counter!("enricher_orphan_events_total").increment(1);
}
