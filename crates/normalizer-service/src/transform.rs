//! Name canonicalization, unit reconciliation, range clamping, and
//! envelope derivation (spec §4.2 steps 1-5).
//!
//! `normalize` is a pure function of its input envelope (spec §4.2
//! "Idempotency"): the Gateway already rejects malformed timestamps at
//! ingress (spec §4.1), so `RawTelemetry.envelope.timestamp` is always a
//! valid instant by construction here and step 4's `timestamp_substituted`
//! path is unreachable for Gateway-originated input; it remains part of
//! `ValidationStatus` for any future producer that writes to `raw` directly.

use std::collections::HashMap;

use telemetry_protocol::envelope::{
    EventType, NormalizationMetadata, NormalizedTelemetry, RawTelemetry, ValidationStatus,
};
use telemetry_protocol::measurement::{
    canonicalize_metric_name, clamp, clamp_window, TemperatureAwareUnit, Vital,
};
use tracing::warn;

/// Normalize a `RawTelemetry` event into a `NormalizedTelemetry` event.
#[must_use]
pub fn normalize(raw: RawTelemetry) -> NormalizedTelemetry {
    let mut vitals = HashMap::new();
    let mut dropped_metrics = Vec::new();
    let mut aliases_applied = Vec::new();
    let mut any_clamped = false;

    for measurement in &raw.measurements {
        let lowered = measurement.metric.to_ascii_lowercase();
        let Some(canonical) = canonicalize_metric_name(&lowered) else {
            warn!(metric = measurement.metric, device_id = raw.device_id, "dropping unrecognized metric");
            dropped_metrics.push(measurement.metric.clone());
            continue;
        };

        if canonical != lowered {
            aliases_applied.push((lowered.clone(), canonical.to_string()));
        }

        let Some(unit) = TemperatureAwareUnit::for_metric(canonical, &measurement.unit) else {
            warn!(metric = canonical, device_id = raw.device_id, "no canonical unit for metric");
            dropped_metrics.push(measurement.metric.clone());
            continue;
        };

        let (value, clamped) = match clamp_window(canonical, unit) {
            Some((min, max)) => clamp(measurement.value, min, max),
            None => (measurement.value, false),
        };

        if clamped {
            any_clamped = true;
            warn!(
                metric = canonical,
                device_id = raw.device_id,
                submitted = measurement.value,
                clamped_to = value,
                "measurement clamped to physiological range"
            );
        }

        vitals.insert(canonical.to_string(), Vital { value, unit, timestamp: raw.envelope.timestamp });
    }

    let validation_status =
        if any_clamped { ValidationStatus::Clamped } else { ValidationStatus::Valid };

    NormalizedTelemetry {
        envelope: raw.envelope.derive(EventType::Normalized),
        device_id: raw.device_id,
        patient_id: None,
        vitals,
        validation_status,
        normalization_metadata: NormalizationMetadata { dropped_metrics, aliases_applied },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use telemetry_protocol::envelope::EventEnvelope;
    use telemetry_protocol::measurement::Measurement;

    fn raw_with(measurements: Vec<Measurement>) -> RawTelemetry {
        RawTelemetry {
            envelope: EventEnvelope::new_lineage(EventType::Raw),
            device_id: "D1".to_string(),
            measurements,
            metadata: None,
        }
    }

    #[test]
    fn canonicalizes_known_alias_and_records_mapping() {
        let raw = raw_with(vec![Measurement { metric: "hr".to_string(), value: 72.0, unit: "bpm".to_string() }]);
        let normalized = normalize(raw);
        assert!(normalized.vitals.contains_key("heart_rate"));
        assert_eq!(normalized.normalization_metadata.aliases_applied, vec![("hr".to_string(), "heart_rate".to_string())]);
    }

    #[test]
    fn drops_unknown_metric() {
        let raw = raw_with(vec![Measurement {
            metric: "blood_pressure".to_string(),
            value: 120.0,
            unit: "mmhg".to_string(),
        }]);
        let normalized = normalize(raw);
        assert!(normalized.vitals.is_empty());
        assert_eq!(normalized.normalization_metadata.dropped_metrics, vec!["blood_pressure".to_string()]);
    }

    #[test]
    fn out_of_range_heart_rate_is_clamped_and_flagged() {
        let raw = raw_with(vec![Measurement {
            metric: "heart_rate".to_string(),
            value: 500.0,
            unit: "bpm".to_string(),
        }]);
        let normalized = normalize(raw);
        assert_eq!(normalized.vitals["heart_rate"].value, 240.0);
        assert_eq!(normalized.validation_status, ValidationStatus::Clamped);
    }

    #[test]
    fn fahrenheit_temperature_is_preserved_not_converted() {
        let raw = raw_with(vec![Measurement {
            metric: "temp".to_string(),
            value: 98.6,
            unit: "fahrenheit".to_string(),
        }]);
        let normalized = normalize(raw);
        let vital = normalized.vitals["temperature"];
        assert_eq!(vital.unit, TemperatureAwareUnit::Fahrenheit);
        assert_eq!(vital.value, 98.6);
    }

    #[test]
    fn celsius_temperature_clamps_to_celsius_window() {
        let raw = raw_with(vec![Measurement {
            metric: "temperature".to_string(),
            value: 60.0,
            unit: "celsius".to_string(),
        }]);
        let normalized = normalize(raw);
        assert_eq!(normalized.vitals["temperature"].value, 45.0);
    }

    #[test]
    fn envelope_links_source_event_id_and_preserves_trace_id() {
        let raw = raw_with(vec![]);
        let raw_event_id = raw.envelope.event_id;
        let raw_trace_id = raw.envelope.trace_id;
        let normalized = normalize(raw);
        assert_eq!(normalized.envelope.source_event_id, Some(raw_event_id));
        assert_eq!(normalized.envelope.trace_id, raw_trace_id);
    }

    #[test]
    fn valid_input_with_no_clamping_is_flagged_valid() {
        let raw = raw_with(vec![Measurement { metric: "hr".to_string(), value: 72.0, unit: "bpm".to_string() }]);
        let normalized = normalize(raw);
        assert_eq!(normalized.validation_status, ValidationStatus::Valid);
    }
}
