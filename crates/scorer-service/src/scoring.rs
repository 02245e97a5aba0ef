//! Per-metric anomaly scoring and overall risk weighting (spec §4.5).

use telemetry_protocol::measurement::{clamp_window, TemperatureAwareUnit};
use telemetry_protocol::severity::Severity;

use crate::baseline::{bootstrap_score, BaselineSnapshot, MIN_SAMPLES};
use crate::store::BaselineStore;

/// Score and severity for a single metric.
#[derive(Debug, Clone, Copy)]
pub struct MetricScore {
    pub score: f64,
    pub severity: Severity,
}

/// Score `value` for `metric` against a baseline snapshot (spec §4.5 steps
/// 1-2). Pure function: does not touch the store.
///
/// `unit` is `None` when the submitted unit doesn't resolve for this metric
/// (e.g. an unrecognized metric name); bootstrap scoring has no clamp
/// window to fall back on in that case, so the sample is reported as a
/// no-op `Ok` score rather than guessing a window.
fn score_against_snapshot(metric: &str, value: f64, unit: Option<TemperatureAwareUnit>, pre: BaselineSnapshot) -> MetricScore {
    if pre.count < MIN_SAMPLES {
        let Some((soft_min, soft_max)) = unit.and_then(|unit| clamp_window(metric, unit)) else {
            return MetricScore { score: 0.0, severity: Severity::Ok };
        };
        let score = bootstrap_score(value, soft_min, soft_max);
        let severity = if value >= soft_min && value <= soft_max { Severity::Ok } else { Severity::Low };
        return MetricScore { score, severity };
    }

    let z = pre.z_score(value);
    let score = z_to_score(z);
    MetricScore { score, severity: Severity::from_score(score) }
}

/// Score `value` for `metric` against the patient's rolling baseline,
/// folding the sample into the baseline as a side effect (spec §4.5 steps
/// 1-3). `unit` is the submitted unit label (e.g. `"bpm"`, `"fahrenheit"`),
/// needed to pick temperature's Celsius vs. Fahrenheit clamp window.
pub async fn score_metric(
    store: &BaselineStore,
    patient_id: &str,
    metric: &str,
    value: f64,
    unit: &str,
) -> MetricScore {
    let pre = store.observe(patient_id, metric, value).await;
    score_against_snapshot(metric, value, TemperatureAwareUnit::for_metric(metric, unit), pre)
}

/// Score `value` against the current baseline without mutating it, used
/// for the dedupe no-op path (spec §9 open question).
pub async fn score_metric_readonly(
    store: &BaselineStore,
    patient_id: &str,
    metric: &str,
    value: f64,
    unit: &str,
) -> MetricScore {
    let pre = store.peek(patient_id, metric).await;
    score_against_snapshot(metric, value, TemperatureAwareUnit::for_metric(metric, unit), pre)
}

/// Map a z-score to a `[0, 1]` anomaly score per the table in spec §4.5.
fn z_to_score(z: f64) -> f64 {
    if z <= 1.0 {
        (z / 1.0) * 0.20
    } else if z <= 2.0 {
        0.20 + (z - 1.0) * 0.20
    } else if z <= 3.0 {
        0.40 + (z - 2.0) * 0.20
    } else if z <= 4.0 {
        0.60 + (z - 3.0) * 0.20
    } else {
        (0.80 + (z - 4.0) * 0.05).min(1.0)
    }
}

/// Overall risk score: `0.35*HR + 0.35*SpO2 + 0.30*Temp`, renormalized over
/// whichever metrics are present (spec §4.5 step 4).
#[must_use]
pub fn overall_risk(scores: &std::collections::HashMap<String, MetricScore>) -> f64 {
    let weights: &[(&str, f64)] =
        &[("heart_rate", 0.35), ("oxygen_saturation", 0.35), ("temperature", 0.30)];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (metric, weight) in weights {
        if let Some(metric_score) = scores.get(*metric) {
            weighted_sum += metric_score.score * weight;
            weight_total += weight;
        }
    }

    if weight_total <= 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn z_to_score_matches_table_boundaries() {
        assert!((z_to_score(0.0) - 0.0).abs() < 1e-9);
        assert!((z_to_score(1.0) - 0.20).abs() < 1e-9);
        assert!((z_to_score(2.0) - 0.40).abs() < 1e-9);
        assert!((z_to_score(3.0) - 0.60).abs() < 1e-9);
        assert!((z_to_score(4.0) - 0.80).abs() < 1e-9);
        assert!(z_to_score(10.0) <= 1.0);
    }

    #[tokio::test]
    async fn bootstrap_scoring_applies_below_min_samples() {
        let store = BaselineStore::new(None);
        let result = score_metric(&store, "P1", "heart_rate", 72.0, "bpm").await;
        assert!(result.score >= 0.2 && result.score <= 0.5);
    }

    #[tokio::test]
    async fn fahrenheit_temperature_uses_fahrenheit_clamp_window() {
        let store = BaselineStore::new(None);
        // 100F is within the Fahrenheit window (86-113) but would be wildly
        // out of range if mistakenly scored against the Celsius window.
        let result = score_metric(&store, "P1", "temperature", 100.0, "fahrenheit").await;
        assert_eq!(result.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn unresolvable_unit_falls_back_to_ok_without_panicking() {
        let store = BaselineStore::new(None);
        let result = score_metric(&store, "P1", "unknown_metric", 42.0, "widgets").await;
        assert_eq!(result.score, 0.0);
        assert_eq!(result.severity, Severity::Ok);
    }

    #[test]
    fn overall_risk_renormalizes_missing_metrics() {
        let mut scores = HashMap::new();
        scores.insert("heart_rate".to_string(), MetricScore { score: 0.5, severity: Severity::Medium });
        let risk = overall_risk(&scores);
        assert!((risk - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overall_risk_is_zero_when_no_metrics_present() {
        let scores = HashMap::new();
        assert_eq!(overall_risk(&scores), 0.0);
    }
}
