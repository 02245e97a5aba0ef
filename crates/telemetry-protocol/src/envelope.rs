//! The fixed envelope (spec §3) and the five event bodies it wraps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::types::{to_iso8601_millis, EventId, TraceId};
use serde::{Deserialize, Serialize};

use crate::measurement::{Measurement, Vital};
use crate::severity::Severity;

/// Current schema version stamped on every emitted event.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// The five pipeline topics, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// `telemetry.raw`
    Raw,
    /// `telemetry.normalized`
    Normalized,
    /// `telemetry.enriched`
    Enriched,
    /// `telemetry.scored`
    Scored,
    /// `alert`
    Alert,
}

impl EventType {
    /// The Kafka topic name for this event type.
    #[must_use]
    pub fn topic(self) -> &'static str {
        match self {
            EventType::Raw => "raw",
            EventType::Normalized => "normalized",
            EventType::Enriched => "enriched",
            EventType::Scored => "scored",
            EventType::Alert => "alerts",
        }
    }
}

/// Fixed metadata present on every pipeline event (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Globally unique identifier for this event.
    pub event_id: EventId,
    /// Correlation identifier, minted at the Gateway and copied unchanged.
    pub trace_id: TraceId,
    /// One of the five topic names.
    pub event_type: EventType,
    /// Schema version, `"major.minor.patch"`.
    pub version: String,
    /// Emission instant, UTC millisecond precision.
    pub timestamp: DateTime<Utc>,
    /// `event_id` of the upstream event that produced this one; empty at
    /// the Gateway.
    pub source_event_id: Option<EventId>,
}

impl EventEnvelope {
    /// Construct the envelope for a brand-new lineage (Gateway only): fresh
    /// `event_id`, fresh `trace_id`, no `source_event_id`.
    #[must_use]
    pub fn new_lineage(event_type: EventType) -> Self {
        Self {
            event_id: EventId::new(),
            trace_id: TraceId::new(),
            event_type,
            version: SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            source_event_id: None,
        }
    }

    /// Construct the envelope for a downstream-derived event: fresh
    /// `event_id`, `trace_id` copied unchanged, `source_event_id` set to the
    /// upstream event's `event_id` (spec §3 invariants).
    #[must_use]
    pub fn derive(&self, event_type: EventType) -> Self {
        Self {
            event_id: EventId::new(),
            trace_id: self.trace_id,
            event_type,
            version: SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            source_event_id: Some(self.event_id),
        }
    }

    /// Render `timestamp` as ISO-8601 with millisecond precision.
    #[must_use]
    pub fn timestamp_iso8601(&self) -> String {
        to_iso8601_millis(self.timestamp)
    }
}

/// Validation outcome stamped on normalized/enriched events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// All measurements were within range and parsed cleanly.
    Valid,
    /// One or more measurements were clamped to the physiological range.
    Clamped,
    /// The input timestamp failed to parse; current instant was substituted.
    TimestampSubstituted,
}

/// Device metadata accompanying a raw submission (battery, firmware, etc).
pub type DeviceMetadata = HashMap<String, serde_json::Value>;

/// `RawTelemetry` = Envelope + `{device_id, measurements[], metadata?}` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTelemetry {
    /// Fixed envelope fields.
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    /// Originating device identifier; also the Kafka partition key.
    pub device_id: String,
    /// As-submitted measurements, before canonicalization.
    pub measurements: Vec<Measurement>,
    /// Opaque device metadata (e.g. battery level, firmware version).
    pub metadata: Option<DeviceMetadata>,
}

/// Bookkeeping the Normalizer attaches to every output (which aliases were
/// mapped, which metrics were dropped).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationMetadata {
    /// Metric names that were dropped for being unrecognized.
    pub dropped_metrics: Vec<String>,
    /// `(alias, canonical)` pairs that were remapped.
    pub aliases_applied: Vec<(String, String)>,
}

/// `NormalizedTelemetry` = Envelope + `{device_id, patient_id?, vitals,
/// validation_status, normalization_metadata}` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTelemetry {
    /// Fixed envelope fields.
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    /// Originating device identifier.
    pub device_id: String,
    /// Patient identifier, if the Gateway or an upstream stage already knew it.
    pub patient_id: Option<String>,
    /// Canonical metric name -> normalized vital.
    pub vitals: HashMap<String, Vital>,
    /// Whether any value was clamped or the timestamp was substituted.
    pub validation_status: ValidationStatus,
    /// Normalizer bookkeeping.
    pub normalization_metadata: NormalizationMetadata,
}

/// Patient demographic summary attached by the Enricher (spec §3 Registry entities).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Patient age in years.
    pub age: u16,
    /// Patient sex.
    pub sex: String,
}

/// Per-metric threshold bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Range {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

/// Blood-pressure threshold bounds (systolic/diastolic).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BloodPressureRange {
    /// Systolic bounds.
    pub systolic: Range,
    /// Diastolic bounds.
    pub diastolic: Range,
}

/// The resolved threshold profile for a patient/device pair (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Heart rate bounds (bpm).
    pub heart_rate: Range,
    /// Blood pressure bounds (mmHg).
    pub blood_pressure: BloodPressureRange,
    /// Temperature bounds (declared unit; see `Measurement`).
    pub temperature: Range,
    /// Oxygen saturation bounds (percent).
    pub oxygen_saturation: Range,
    /// Respiratory rate bounds (breaths/min).
    pub respiratory_rate: Range,
}

/// Which registry lookups contributed to an `EnrichedTelemetry` event (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentMetadata {
    /// e.g. `["device", "patient", "thresholds"]`, or `["none"]` for a fully
    /// degraded registry (spec boundary scenario 4).
    pub enrichment_sources: Vec<String>,
}

/// `EnrichedTelemetry` = `NormalizedTelemetry` plus `{patient_id, orphan?,
/// patientProfile?, thresholds?, enrichment_metadata}` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedTelemetry {
    /// Fixed envelope fields.
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    /// Originating device identifier.
    pub device_id: String,
    /// Resolved patient identifier (may be absent only when `orphan` is true).
    pub patient_id: Option<String>,
    /// True when no `patient_id` could be resolved (spec §3 invariant).
    pub orphan: bool,
    /// Canonical metric name -> normalized vital (carried through from normalized).
    pub vitals: HashMap<String, Vital>,
    /// Validation status carried through from the normalized event.
    pub validation_status: ValidationStatus,
    /// Patient demographic summary, absent for orphan events.
    pub patient_profile: Option<PatientProfile>,
    /// Resolved threshold profile, absent for orphan events.
    pub thresholds: Option<ThresholdProfile>,
    /// Which lookups contributed.
    pub enrichment_metadata: EnrichmentMetadata,
}

/// Per-metric anomaly score with derived severity (spec §4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricScore {
    /// Score in `[0.0, 1.0]`.
    pub score: f64,
    /// Severity derived from the score via the z-score mapping table.
    pub severity: Severity,
}

/// A single rule that fired during evaluation (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredRule {
    /// Rule identifier, e.g. `"R1"`.
    pub rule_id: String,
    /// Metric the rule evaluated.
    pub metric: String,
    /// Observed value at evaluation time.
    pub observed_value: f64,
    /// Severity this rule contributes.
    pub severity: Severity,
}

/// `ScoredTelemetry` = `EnrichedTelemetry` plus `{anomaly_scores,
/// overall_risk_score, rulesTriggered[]}` (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTelemetry {
    /// Fixed envelope fields.
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    /// Originating device identifier.
    pub device_id: String,
    /// Resolved patient identifier.
    pub patient_id: Option<String>,
    /// True when no `patient_id` could be resolved.
    pub orphan: bool,
    /// Per-metric anomaly scores.
    pub anomaly_scores: HashMap<String, MetricScore>,
    /// Weighted overall risk score in `[0.0, 1.0]`.
    pub overall_risk_score: f64,
    /// Rules that fired for this event, empty for `ok` severity.
    pub rules_triggered: Vec<TriggeredRule>,
    /// Aggregate severity across rules and anomaly scores.
    pub severity: Severity,
    /// True if the Anomaly Scorer was unreachable and scores were zeroed
    /// (spec §4.4 step 1).
    pub anomaly_degraded: bool,
}

/// `Alert` = `{alert_id, patient_id, device_id, severity, alert_type,
/// timestamp, condition, details}` (spec §3, §4.4 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Fixed envelope fields (the alert's own lineage).
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    /// Identifier for this alert, distinct from `envelope.event_id`.
    pub alert_id: EventId,
    /// Patient the alert concerns.
    pub patient_id: String,
    /// Device that produced the triggering telemetry.
    pub device_id: String,
    /// Aggregate severity, always `!= Severity::Ok`.
    pub severity: Severity,
    /// Fixed alert category.
    pub alert_type: String,
    /// One-line summary of the first triggering rule.
    pub condition: String,
    /// All rules that triggered.
    pub details: Vec<TriggeredRule>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn derive_preserves_trace_id_and_links_source() {
        let raw = EventEnvelope::new_lineage(EventType::Raw);
        let normalized = raw.derive(EventType::Normalized);

        assert_eq!(normalized.trace_id, raw.trace_id);
        assert_eq!(normalized.source_event_id, Some(raw.event_id));
        assert_ne!(normalized.event_id, raw.event_id);
    }

    #[test]
    fn new_lineage_has_no_source() {
        let raw = EventEnvelope::new_lineage(EventType::Raw);
        assert!(raw.source_event_id.is_none());
    }

    #[test]
    fn lineage_chain_preserves_trace_id_end_to_end() {
        let raw = EventEnvelope::new_lineage(EventType::Raw);
        let normalized = raw.derive(EventType::Normalized);
        let enriched = normalized.derive(EventType::Enriched);
        let scored = enriched.derive(EventType::Scored);
        let alert = scored.derive(EventType::Alert);

        for env in [&normalized, &enriched, &scored, &alert] {
            assert_eq!(env.trace_id, raw.trace_id, "P1: trace_id must propagate");
        }
        assert_eq!(scored.source_event_id, Some(enriched.event_id));
    }

    #[test]
    fn topic_names_match_spec() {
        assert_eq!(EventType::Raw.topic(), "raw");
        assert_eq!(EventType::Normalized.topic(), "normalized");
        assert_eq!(EventType::Enriched.topic(), "enriched");
        assert_eq!(EventType::Scored.topic(), "scored");
        assert_eq!(EventType::Alert.topic(), "alerts");
    }

    #[test]
    fn envelope_serializes_flattened() {
        let env = EventEnvelope::new_lineage(EventType::Raw);
        let raw = RawTelemetry {
            envelope: env,
            device_id: "D1".to_string(),
            measurements: vec![],
            metadata: None,
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert!(json.get("event_id").is_some());
        assert!(json.get("device_id").is_some());
    }
}
