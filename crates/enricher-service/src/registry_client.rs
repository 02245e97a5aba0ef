//! Registry lookups with per-call deadlines and linear-backoff retry
//! (spec §4.3).

use std::time::Duration;

use common::retry::LinearBackoff;
use telemetry_proto::registry::registry_client::RegistryClient as WireRegistryClient;
use telemetry_proto::registry::{
    GetDeviceRequest, GetPatientRequest, GetThresholdProfileRequest, Status as WireStatus,
};
use telemetry_protocol::envelope::{BloodPressureRange, PatientProfile, Range, ThresholdProfile};
use tonic::transport::Channel;
use tracing::warn;

/// Outcome of a `GetDevice` lookup.
pub enum DeviceLookup {
    /// The device is registered; its `patient_id` may or may not be set.
    Found { patient_id: Option<String> },
    /// The Registry confirmed the device does not exist.
    NotFound,
    /// The Registry could not be reached after retries.
    Unreachable,
}

/// Outcome of a `GetPatient`/`GetThresholdProfile` lookup; both are
/// non-fatal on failure (spec §4.3).
pub enum LookupOutcome<T> {
    Found(T),
    NotFound,
    Unreachable,
}

pub struct RegistryClient {
    client: WireRegistryClient<Channel>,
    timeout: Duration,
    backoff: LinearBackoff,
}

impl RegistryClient {
    /// # Errors
    ///
    /// Returns a transport error if `endpoint` cannot be parsed as a URI.
    pub fn connect(endpoint: &str, timeout_ms: u64) -> Result<Self, tonic::transport::Error> {
        let channel = Channel::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self {
            client: WireRegistryClient::new(channel),
            timeout: Duration::from_millis(timeout_ms),
            backoff: LinearBackoff::registry_lookup_default(),
        })
    }

    pub async fn get_device(&self, device_id: &str) -> DeviceLookup {
        for attempt in 1..=self.backoff.max_attempts() {
            let mut request = tonic::Request::new(GetDeviceRequest { device_id: device_id.to_string() });
            request.set_timeout(self.timeout);

            match self.client.clone().get_device(request).await {
                Ok(response) => {
                    let body = response.into_inner();
                    if body.status == WireStatus::Success as i32 {
                        let patient_id = body.device.and_then(|d| d.patient_id);
                        return DeviceLookup::Found { patient_id };
                    } else if body.status == WireStatus::NotFound as i32 {
                        return DeviceLookup::NotFound;
                    }
                    warn!(device_id, attempt, status = body.status, "get_device returned non-success status");
                }
                Err(e) => {
                    warn!(device_id, attempt, error = %e, "get_device call failed");
                }
            }
            if attempt < self.backoff.max_attempts() {
                tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
            }
        }
        DeviceLookup::Unreachable
    }

    pub async fn get_patient(&self, patient_id: &str) -> LookupOutcome<PatientProfile> {
        for attempt in 1..=self.backoff.max_attempts() {
            let mut request = tonic::Request::new(GetPatientRequest { patient_id: patient_id.to_string() });
            request.set_timeout(self.timeout);

            match self.client.clone().get_patient(request).await {
                Ok(response) => {
                    let body = response.into_inner();
                    if body.status == WireStatus::Success as i32 {
                        if let Some(patient) = body.patient {
                            return LookupOutcome::Found(PatientProfile {
                                age: u16::try_from(patient.age).unwrap_or(u16::MAX),
                                sex: patient.sex,
                            });
                        }
                    } else if body.status == WireStatus::NotFound as i32 {
                        return LookupOutcome::NotFound;
                    }
                    warn!(patient_id, attempt, status = body.status, "get_patient returned non-success status");
                }
                Err(e) => {
                    warn!(patient_id, attempt, error = %e, "get_patient call failed");
                }
            }
            if attempt < self.backoff.max_attempts() {
                tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
            }
        }
        LookupOutcome::Unreachable
    }

    pub async fn get_threshold_profile(
        &self,
        patient_id: &str,
        device_id: &str,
    ) -> LookupOutcome<ThresholdProfile> {
        for attempt in 1..=self.backoff.max_attempts() {
            let mut request = tonic::Request::new(GetThresholdProfileRequest {
                patient_id: patient_id.to_string(),
                device_id: Some(device_id.to_string()),
            });
            request.set_timeout(self.timeout);

            match self.client.clone().get_threshold_profile(request).await {
                Ok(response) => {
                    let body = response.into_inner();
                    if body.status == WireStatus::Success as i32 {
                        if let Some(thresholds) = body.thresholds {
                            return LookupOutcome::Found(to_domain_thresholds(thresholds));
                        }
                    } else if body.status == WireStatus::NotFound as i32 {
                        return LookupOutcome::NotFound;
                    }
                    warn!(patient_id, attempt, status = body.status, "get_threshold_profile returned non-success status");
                }
                Err(e) => {
                    warn!(patient_id, attempt, error = %e, "get_threshold_profile call failed");
                }
            }
            if attempt < self.backoff.max_attempts() {
                tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
            }
        }
        LookupOutcome::Unreachable
    }
}

fn to_domain_range(range: Option<telemetry_proto::registry::Range>) -> Range {
    range.map_or(Range { min: 0.0, max: 0.0 }, |r| Range { min: r.min, max: r.max })
}

fn to_domain_thresholds(wire: telemetry_proto::registry::ThresholdProfile) -> ThresholdProfile {
    let blood_pressure = wire.blood_pressure.unwrap_or_default();
    ThresholdProfile {
        heart_rate: to_domain_range(wire.heart_rate),
        blood_pressure: BloodPressureRange {
            systolic: to_domain_range(blood_pressure.systolic),
            diastolic: to_domain_range(blood_pressure.diastolic),
        },
        temperature: to_domain_range(wire.temperature),
        oxygen_saturation: to_domain_range(wire.oxygen_saturation),
        respiratory_rate: to_domain_range(wire.respiratory_rate),
    }
}
