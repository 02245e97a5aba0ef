//! Pre-configured test data fixtures for pipeline testing.
//!
//! Provides builders for the event bodies carried on the `raw` through
//! `alerts` topics, so individual service tests can construct a realistic
//! upstream event without threading an entire pipeline run.

use std::collections::HashMap;

use chrono::Utc;
use telemetry_protocol::envelope::{
    Alert, EnrichedTelemetry, EnrichmentMetadata, EventEnvelope, EventType, NormalizationMetadata,
    NormalizedTelemetry, PatientProfile, RawTelemetry, ScoredTelemetry, ThresholdProfile,
    ValidationStatus,
};
use telemetry_protocol::measurement::{Measurement, TemperatureAwareUnit, Vital};
use telemetry_protocol::severity::Severity;

/// Build a heart-rate measurement in beats per minute.
#[must_use]
pub fn heart_rate_measurement(value: f64) -> Measurement {
    Measurement { metric: "heart_rate".to_string(), value, unit: "bpm".to_string() }
}

/// Build an oxygen-saturation measurement as a percentage.
#[must_use]
pub fn spo2_measurement(value: f64) -> Measurement {
    Measurement { metric: "oxygen_saturation".to_string(), value, unit: "percent".to_string() }
}

/// Build a Fahrenheit temperature measurement.
#[must_use]
pub fn temperature_f_measurement(value: f64) -> Measurement {
    Measurement { metric: "temperature".to_string(), value, unit: "fahrenheit".to_string() }
}

/// Builder for a `RawTelemetry` fixture, as it would arrive fresh off the
/// `raw` topic.
#[derive(Debug, Clone)]
pub struct RawTelemetryBuilder {
    device_id: String,
    measurements: Vec<Measurement>,
    metadata: Option<HashMap<String, serde_json::Value>>,
}

impl RawTelemetryBuilder {
    /// Start building a raw telemetry fixture for the given device.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            measurements: vec![heart_rate_measurement(72.0), spo2_measurement(98.0)],
            metadata: None,
        }
    }

    /// Replace the measurement set.
    #[must_use]
    pub fn with_measurements(mut self, measurements: Vec<Measurement>) -> Self {
        self.measurements = measurements;
        self
    }

    /// Attach device metadata (battery, firmware, etc).
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Finish building, minting a fresh lineage envelope.
    #[must_use]
    pub fn build(self) -> RawTelemetry {
        RawTelemetry {
            envelope: EventEnvelope::new_lineage(EventType::Raw),
            device_id: self.device_id,
            measurements: self.measurements,
            metadata: self.metadata,
        }
    }
}

/// Builder for a `NormalizedTelemetry` fixture, bypassing the Normalizer.
#[derive(Debug, Clone)]
pub struct NormalizedTelemetryBuilder {
    device_id: String,
    patient_id: Option<String>,
    vitals: HashMap<String, Vital>,
    validation_status: ValidationStatus,
}

impl NormalizedTelemetryBuilder {
    /// Start building a normalized telemetry fixture for the given device,
    /// seeded with a healthy heart rate and oxygen saturation.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut vitals = HashMap::new();
        vitals.insert(
            "heart_rate".to_string(),
            Vital { value: 72.0, unit: TemperatureAwareUnit::Bpm, timestamp: now },
        );
        vitals.insert(
            "oxygen_saturation".to_string(),
            Vital { value: 98.0, unit: TemperatureAwareUnit::Percent, timestamp: now },
        );
        Self { device_id: device_id.into(), patient_id: None, vitals, validation_status: ValidationStatus::Valid }
    }

    /// Set the resolved patient id (as if a prior stage already knew it).
    #[must_use]
    pub fn with_patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    /// Replace the vitals map entirely.
    #[must_use]
    pub fn with_vitals(mut self, vitals: HashMap<String, Vital>) -> Self {
        self.vitals = vitals;
        self
    }

    /// Set a single vital, inserting or overwriting it.
    #[must_use]
    pub fn with_vital(mut self, metric: impl Into<String>, vital: Vital) -> Self {
        self.vitals.insert(metric.into(), vital);
        self
    }

    /// Override the validation status (default `Valid`).
    #[must_use]
    pub fn with_validation_status(mut self, status: ValidationStatus) -> Self {
        self.validation_status = status;
        self
    }

    /// Finish building, minting a fresh lineage envelope.
    #[must_use]
    pub fn build(self) -> NormalizedTelemetry {
        NormalizedTelemetry {
            envelope: EventEnvelope::new_lineage(EventType::Normalized),
            device_id: self.device_id,
            patient_id: self.patient_id,
            vitals: self.vitals,
            validation_status: self.validation_status,
            normalization_metadata: NormalizationMetadata::default(),
        }
    }
}

/// A permissive threshold profile, wide enough that no rule fires.
#[must_use]
pub fn lenient_threshold_profile() -> ThresholdProfile {
    ThresholdProfile {
        heart_rate: telemetry_protocol::envelope::Range { min: 40.0, max: 140.0 },
        blood_pressure: telemetry_protocol::envelope::BloodPressureRange {
            systolic: telemetry_protocol::envelope::Range { min: 80.0, max: 160.0 },
            diastolic: telemetry_protocol::envelope::Range { min: 40.0, max: 100.0 },
        },
        temperature: telemetry_protocol::envelope::Range { min: 90.0, max: 104.0 },
        oxygen_saturation: telemetry_protocol::envelope::Range { min: 88.0, max: 100.0 },
        respiratory_rate: telemetry_protocol::envelope::Range { min: 8.0, max: 30.0 },
    }
}

/// Builder for an `EnrichedTelemetry` fixture, bypassing the Enricher and
/// its Registry round-trips entirely.
#[derive(Debug, Clone)]
pub struct EnrichedTelemetryBuilder {
    normalized: NormalizedTelemetry,
    patient_id: Option<String>,
    orphan: bool,
    patient_profile: Option<PatientProfile>,
    thresholds: Option<ThresholdProfile>,
    sources: Vec<String>,
}

impl EnrichedTelemetryBuilder {
    /// Start from a normalized fixture, defaulting to a fully resolved,
    /// non-orphan patient with a lenient threshold profile.
    #[must_use]
    pub fn from_normalized(normalized: NormalizedTelemetry) -> Self {
        Self {
            patient_id: normalized.patient_id.clone().or_else(|| Some("patient-1".to_string())),
            orphan: false,
            patient_profile: Some(PatientProfile { age: 64, sex: "f".to_string() }),
            thresholds: Some(lenient_threshold_profile()),
            sources: vec!["device".to_string(), "patient".to_string(), "thresholds".to_string()],
            normalized,
        }
    }

    /// Mark this event as orphaned: no patient id, no profile, no thresholds.
    #[must_use]
    pub fn orphan(mut self) -> Self {
        self.orphan = true;
        self.patient_id = None;
        self.patient_profile = None;
        self.thresholds = None;
        self.sources = vec!["none".to_string()];
        self
    }

    /// Override the threshold profile.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ThresholdProfile) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Clear the threshold profile while remaining non-orphan (registry
    /// degraded on the threshold lookup only).
    #[must_use]
    pub fn without_thresholds(mut self) -> Self {
        self.thresholds = None;
        self.sources.retain(|s| s != "thresholds");
        self
    }

    /// Finish building, deriving the envelope from the normalized source.
    #[must_use]
    pub fn build(self) -> EnrichedTelemetry {
        EnrichedTelemetry {
            envelope: self.normalized.envelope.derive(EventType::Enriched),
            device_id: self.normalized.device_id,
            patient_id: self.patient_id,
            orphan: self.orphan,
            vitals: self.normalized.vitals,
            validation_status: self.normalized.validation_status,
            patient_profile: self.patient_profile,
            thresholds: self.thresholds,
            enrichment_metadata: EnrichmentMetadata { enrichment_sources: self.sources },
        }
    }
}

/// Builder for a `ScoredTelemetry` fixture.
#[derive(Debug, Clone)]
pub struct ScoredTelemetryBuilder {
    enriched: EnrichedTelemetry,
    anomaly_scores: HashMap<String, telemetry_protocol::envelope::MetricScore>,
    overall_risk_score: f64,
    rules_triggered: Vec<telemetry_protocol::envelope::TriggeredRule>,
    severity: Severity,
    anomaly_degraded: bool,
}

impl ScoredTelemetryBuilder {
    /// Start from an enriched fixture with no anomalies and `Ok` severity.
    #[must_use]
    pub fn from_enriched(enriched: EnrichedTelemetry) -> Self {
        Self {
            enriched,
            anomaly_scores: HashMap::new(),
            overall_risk_score: 0.0,
            rules_triggered: Vec::new(),
            severity: Severity::Ok,
            anomaly_degraded: false,
        }
    }

    /// Set the aggregate severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Replace the triggered-rule list.
    #[must_use]
    pub fn with_rules_triggered(mut self, rules: Vec<telemetry_protocol::envelope::TriggeredRule>) -> Self {
        self.rules_triggered = rules;
        self
    }

    /// Finish building, deriving the envelope from the enriched source.
    #[must_use]
    pub fn build(self) -> ScoredTelemetry {
        ScoredTelemetry {
            envelope: self.enriched.envelope.derive(EventType::Scored),
            device_id: self.enriched.device_id,
            patient_id: self.enriched.patient_id,
            orphan: self.enriched.orphan,
            anomaly_scores: self.anomaly_scores,
            overall_risk_score: self.overall_risk_score,
            rules_triggered: self.rules_triggered,
            severity: self.severity,
            anomaly_degraded: self.anomaly_degraded,
        }
    }
}

/// Build a minimal `Alert` fixture for a patient/device pair at the given
/// severity (must not be `Ok`, matching the spec invariant).
#[must_use]
pub fn alert_fixture(patient_id: impl Into<String>, device_id: impl Into<String>, severity: Severity) -> Alert {
    Alert {
        envelope: EventEnvelope::new_lineage(EventType::Alert),
        alert_id: common::types::EventId::new(),
        patient_id: patient_id.into(),
        device_id: device_id.into(),
        severity,
        alert_type: "vital_sign_anomaly".to_string(),
        condition: "heart_rate 150.0 exceeds max 140.0".to_string(),
        details: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_builder_defaults_have_two_measurements() {
        let raw = RawTelemetryBuilder::new("dev-1").build();
        assert_eq!(raw.device_id, "dev-1");
        assert_eq!(raw.measurements.len(), 2);
    }

    #[test]
    fn enriched_builder_defaults_to_non_orphan() {
        let normalized = NormalizedTelemetryBuilder::new("dev-1").build();
        let enriched = EnrichedTelemetryBuilder::from_normalized(normalized).build();
        assert!(!enriched.orphan);
        assert!(enriched.thresholds.is_some());
        assert_eq!(enriched.enrichment_metadata.enrichment_sources.len(), 3);
    }

    #[test]
    fn enriched_builder_orphan_clears_patient_fields() {
        let normalized = NormalizedTelemetryBuilder::new("dev-1").build();
        let enriched = EnrichedTelemetryBuilder::from_normalized(normalized).orphan().build();
        assert!(enriched.orphan);
        assert!(enriched.patient_id.is_none());
        assert_eq!(enriched.enrichment_metadata.enrichment_sources, vec!["none".to_string()]);
    }

    #[test]
    fn lineage_is_preserved_through_the_chain() {
        let raw = RawTelemetryBuilder::new("dev-1").build();
        let normalized = NormalizedTelemetryBuilder::new("dev-1").build();
        let enriched = EnrichedTelemetryBuilder::from_normalized(normalized.clone()).build();
        assert_eq!(enriched.envelope.trace_id, normalized.envelope.trace_id);
        assert_eq!(enriched.envelope.source_event_id, Some(normalized.envelope.event_id));
        assert_ne!(raw.envelope.trace_id, normalized.envelope.trace_id);
    }
}
