//! Prometheus metrics for the Rules Engine (spec §9.3).

use metrics::counter;

pub fn record_processed(outcome: &'static str) {
    counter!("rules_events_processed_total", "outcome" => outcome).increment(1);
}

pub fn record_alert(severity: &'static str) {
    counter!("rules_alerts_emitted_total", "severity" => severity).increment(1);
}

pub fn record_anomaly_degraded() {
    counter!("rules_anomaly_degraded_total").increment(1);
}
