//! Core ingestion logic shared by the HTTP and RPC ingress surfaces (spec
//! §4.1). Both surfaces validate, optionally verify the device, build a
//! `RawTelemetry` envelope, and publish it to the `raw` topic.

use common::types::EventId;
use telemetry_protocol::envelope::{DeviceMetadata, EventEnvelope, EventType, RawTelemetry};
use telemetry_protocol::measurement::Measurement;
use tracing::{info, instrument};

use crate::error::GatewayError;
use crate::registry_client::{RegistryVerifier, VerificationOutcome};
use crate::validation::validate_submission;

pub struct IngestService {
    producer: telemetry_protocol::broker::EventProducer,
    verifier: Option<RegistryVerifier>,
    device_verification_enabled: bool,
}

impl IngestService {
    #[must_use]
    pub fn new(
        producer: telemetry_protocol::broker::EventProducer,
        verifier: Option<RegistryVerifier>,
        device_verification_enabled: bool,
    ) -> Self {
        Self { producer, verifier, device_verification_enabled }
    }

    /// Validate, verify, and publish a submission. Returns the freshly
    /// minted `event_id` for acknowledgement back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] on a malformed payload,
    /// [`GatewayError::DeviceNotFound`] when verification is enabled and the
    /// Registry confirms the device does not exist, or
    /// [`GatewayError::Internal`] if publication fails after retries.
    #[instrument(skip(self, measurements, metadata))]
    pub async fn ingest(
        &self,
        device_id: &str,
        raw_timestamp: &str,
        measurements: Vec<Measurement>,
        metadata: Option<DeviceMetadata>,
    ) -> Result<EventId, GatewayError> {
        let submitted_at = validate_submission(device_id, raw_timestamp, &measurements)?;

        if self.device_verification_enabled {
            if let Some(verifier) = &self.verifier {
                match verifier.verify(device_id).await {
                    VerificationOutcome::NotFound => {
                        return Err(GatewayError::DeviceNotFound(format!(
                            "device {device_id} is not registered"
                        )));
                    }
                    VerificationOutcome::Known | VerificationOutcome::Unreachable => {}
                }
            }
        }

        let mut envelope = EventEnvelope::new_lineage(EventType::Raw);
        envelope.timestamp = submitted_at;
        let event_id = envelope.event_id;

        let raw = RawTelemetry { envelope, device_id: device_id.to_string(), measurements, metadata };

        self.producer
            .publish(EventType::Raw.topic(), device_id, &raw)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!(%event_id, device_id, "accepted telemetry submission");
        Ok(event_id)
    }
}
