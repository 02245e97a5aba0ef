//! Ordered registry lookups and enrichment assembly (spec §4.3).

use telemetry_protocol::envelope::{EnrichedTelemetry, EnrichmentMetadata, EventType, NormalizedTelemetry};

use crate::registry_client::{DeviceLookup, LookupOutcome, RegistryClient};

/// Enrich a normalized event with device/patient/threshold data. Never
/// fails: lookup failures degrade the output rather than erroring (spec
/// §4.3: "A persistently unreachable Registry degrades enrichment to
/// orphan-only but never blocks the pipeline").
pub async fn enrich(client: &RegistryClient, normalized: NormalizedTelemetry) -> EnrichedTelemetry {
    let mut sources = Vec::new();

    let patient_id = match client.get_device(&normalized.device_id).await {
        DeviceLookup::Found { patient_id: Some(patient_id) } => {
            sources.push("device".to_string());
            Some(patient_id)
        }
        DeviceLookup::Found { patient_id: None } => {
            sources.push("device".to_string());
            normalized.patient_id.clone()
        }
        DeviceLookup::NotFound => {
            sources.push("device".to_string());
            normalized.patient_id.clone()
        }
        DeviceLookup::Unreachable => normalized.patient_id.clone(),
    };

    let orphan = patient_id.is_none();

    let (patient_profile, thresholds) = if let Some(patient_id) = &patient_id {
        let patient_profile = match client.get_patient(patient_id).await {
            LookupOutcome::Found(profile) => {
                sources.push("patient".to_string());
                Some(profile)
            }
            LookupOutcome::NotFound | LookupOutcome::Unreachable => None,
        };

        let thresholds = match client.get_threshold_profile(patient_id, &normalized.device_id).await {
            LookupOutcome::Found(thresholds) => {
                sources.push("thresholds".to_string());
                Some(thresholds)
            }
            LookupOutcome::NotFound | LookupOutcome::Unreachable => None,
        };

        (patient_profile, thresholds)
    } else {
        (None, None)
    };

    if sources.is_empty() {
        sources.push("none".to_string());
    }

    EnrichedTelemetry {
        envelope: normalized.envelope.derive(EventType::Enriched),
        device_id: normalized.device_id,
        patient_id,
        orphan,
        vitals: normalized.vitals,
        validation_status: normalized.validation_status,
        patient_profile,
        thresholds,
        enrichment_metadata: EnrichmentMetadata { enrichment_sources: sources },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use telemetry_protocol::envelope::{EventEnvelope, NormalizationMetadata};

    fn normalized_with_patient_id(patient_id: Option<String>) -> NormalizedTelemetry {
        NormalizedTelemetry {
            envelope: EventEnvelope::new_lineage(EventType::Normalized),
            device_id: "D1".to_string(),
            patient_id,
            vitals: std::collections::HashMap::new(),
            validation_status: telemetry_protocol::envelope::ValidationStatus::Valid,
            normalization_metadata: NormalizationMetadata::default(),
        }
    }

    #[test]
    fn orphan_when_no_patient_id_available() {
        let normalized = normalized_with_patient_id(None);
        assert!(normalized.patient_id.is_none());
    }

    #[test]
    fn keeps_prior_patient_id_shape() {
        let normalized = normalized_with_patient_id(Some("P1".to_string()));
        assert_eq!(normalized.patient_id, Some("P1".to_string()));
    }

    #[tokio::test]
    async fn full_lookup_resolves_device_patient_and_thresholds() {
        let mock = pipeline_test_utils::MockRegistry::builder()
            .known_device("D1", Some("P1"))
            .known_patient("P1", 70, "f")
            .known_thresholds("P1", pipeline_test_utils::lenient_wire_thresholds("P1"));
        let server = pipeline_test_utils::TestRegistryServer::spawn(mock).await;
        let client = RegistryClient::connect(&server.endpoint(), 1_000).expect("connect");

        let enriched = enrich(&client, normalized_with_patient_id(None)).await;

        assert!(!enriched.orphan);
        assert_eq!(enriched.patient_id, Some("P1".to_string()));
        assert!(enriched.patient_profile.is_some());
        assert!(enriched.thresholds.is_some());
        assert_eq!(
            enriched.enrichment_metadata.enrichment_sources,
            vec!["device".to_string(), "patient".to_string(), "thresholds".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_device_falls_back_to_upstream_patient_id() {
        let mock = pipeline_test_utils::MockRegistry::builder();
        let server = pipeline_test_utils::TestRegistryServer::spawn(mock).await;
        let client = RegistryClient::connect(&server.endpoint(), 1_000).expect("connect");

        let enriched = enrich(&client, normalized_with_patient_id(None)).await;

        assert!(enriched.orphan);
        assert_eq!(enriched.enrichment_metadata.enrichment_sources, vec!["device".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_registry_degrades_to_orphan_with_no_sources() {
        let mock = pipeline_test_utils::MockRegistry::unreachable();
        let server = pipeline_test_utils::TestRegistryServer::spawn(mock).await;
        let client = RegistryClient::connect(&server.endpoint(), 200).expect("connect");

        let enriched = enrich(&client, normalized_with_patient_id(None)).await;

        assert!(enriched.orphan);
        assert_eq!(enriched.enrichment_metadata.enrichment_sources, vec!["none".to_string()]);
    }
}
