//! Scored-event and alert assembly (spec §4.4 steps 3-5).

use common::types::EventId;
use telemetry_protocol::envelope::{
    Alert, EnrichedTelemetry, EventType, ScoredTelemetry, ThresholdProfile, TriggeredRule,
};
use telemetry_protocol::severity::Severity;

use crate::scorer_client::ScoringResult;

pub const ALERT_TYPE: &str = "vital_sign_anomaly";

/// Build the `scored` event and, if warranted, the paired `alert` (spec
/// §4.4 steps 3-5). Orphan events and events with no triggered rules and a
/// non-degraded `ok` anomaly severity never produce an alert.
#[must_use]
pub fn build(
    enriched: &EnrichedTelemetry,
    triggered: Vec<TriggeredRule>,
    scoring: ScoringResult,
) -> (ScoredTelemetry, Option<Alert>) {
    let rule_severity = Severity::max_of(triggered.iter().map(|r| r.severity));
    let anomaly_severity = Severity::max_of(scoring.scores.values().map(|s| s.severity));
    let severity = if enriched.orphan { Severity::Ok } else { rule_severity.max(anomaly_severity) };

    let scored = ScoredTelemetry {
        envelope: enriched.envelope.derive(EventType::Scored),
        device_id: enriched.device_id.clone(),
        patient_id: enriched.patient_id.clone(),
        orphan: enriched.orphan,
        anomaly_scores: scoring.scores,
        overall_risk_score: scoring.overall_risk_score,
        rules_triggered: triggered.clone(),
        severity,
        anomaly_degraded: scoring.degraded,
    };

    if severity == Severity::Ok {
        return (scored, None);
    }

    let condition = triggered
        .first()
        .map(|rule| condition_text(rule, enriched.thresholds.as_ref()))
        .unwrap_or_else(|| {
            format!(
                "anomaly score indicates {severity:?} risk (overall_risk_score={:.2})",
                scored.overall_risk_score
            )
        });

    let alert = Alert {
        envelope: scored.envelope.derive(EventType::Alert),
        alert_id: EventId::new(),
        patient_id: scored.patient_id.clone().unwrap_or_default(),
        device_id: scored.device_id.clone(),
        severity,
        alert_type: ALERT_TYPE.to_string(),
        condition,
        details: triggered,
    };

    (scored, Some(alert))
}

fn condition_text(rule: &TriggeredRule, thresholds: Option<&ThresholdProfile>) -> String {
    match rule.rule_id.as_str() {
        "R1" => format!(
            "heart_rate {} exceeds max {}",
            rule.observed_value,
            thresholds.map_or(f64::NAN, |t| t.heart_rate.max)
        ),
        "R2" => format!(
            "oxygen_saturation {} below min {}",
            rule.observed_value,
            thresholds.map_or(f64::NAN, |t| t.oxygen_saturation.min)
        ),
        "R3" => format!(
            "temperature {} exceeds max {}",
            rule.observed_value,
            thresholds.map_or(f64::NAN, |t| t.temperature.max)
        ),
        "R4" => format!("heart_rate {} combined with critically low oxygen_saturation", rule.observed_value),
        _ => format!("{} breached on {} (observed {})", rule.rule_id, rule.metric, rule.observed_value),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use telemetry_protocol::envelope::{EnrichmentMetadata, EventEnvelope, ValidationStatus};

    fn enriched(orphan: bool) -> EnrichedTelemetry {
        EnrichedTelemetry {
            envelope: EventEnvelope::new_lineage(EventType::Enriched),
            device_id: "D1".to_string(),
            patient_id: (!orphan).then(|| "P1".to_string()),
            orphan,
            vitals: HashMap::new(),
            validation_status: ValidationStatus::Valid,
            patient_profile: None,
            thresholds: None,
            enrichment_metadata: EnrichmentMetadata::default(),
        }
    }

    fn scoring(degraded: bool) -> ScoringResult {
        ScoringResult { scores: HashMap::new(), overall_risk_score: 0.0, degraded }
    }

    #[test]
    fn orphan_never_produces_alert() {
        let triggered = vec![TriggeredRule {
            rule_id: "R1".to_string(),
            metric: "heart_rate".to_string(),
            observed_value: 200.0,
            severity: Severity::Warning,
        }];
        let (scored, alert) = build(&enriched(true), triggered, scoring(false));
        assert_eq!(scored.severity, Severity::Ok);
        assert!(alert.is_none());
    }

    #[test]
    fn no_triggered_rules_and_ok_anomaly_produces_no_alert() {
        let (scored, alert) = build(&enriched(false), vec![], scoring(false));
        assert_eq!(scored.severity, Severity::Ok);
        assert!(alert.is_none());
    }

    #[test]
    fn triggered_rule_produces_alert_with_matching_severity() {
        let triggered = vec![TriggeredRule {
            rule_id: "R2".to_string(),
            metric: "oxygen_saturation".to_string(),
            observed_value: 88.0,
            severity: Severity::Critical,
        }];
        let (scored, alert) = build(&enriched(false), triggered, scoring(false));
        assert_eq!(scored.severity, Severity::Critical);
        let alert = alert.unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert_ne!(alert.alert_id, scored.envelope.event_id);
    }
}
