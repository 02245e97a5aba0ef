//! `Registry` gRPC service implementation (spec §4.6).

use sqlx::PgPool;
use telemetry_proto::registry::registry_server::Registry;
use telemetry_proto::registry::{
    BloodPressureRange, Device, GetDeviceRequest, GetDeviceResponse, GetPatientRequest,
    GetPatientResponse, GetThresholdProfileRequest, GetThresholdProfileResponse, Patient, Range,
    Status as WireStatus, ThresholdProfile,
};
use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::metrics::record_rpc;
use crate::repository;

/// Maximum allowed length for an identifier supplied by an RPC caller.
const MAX_ID_LENGTH: usize = 255;

pub struct RegistryService {
    pool: PgPool,
}

impl RegistryService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn validate_id(id: &str, field_name: &str) -> Result<(), Status> {
    if id.is_empty() {
        return Err(Status::invalid_argument(format!("{field_name} is required")));
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(Status::invalid_argument(format!("{field_name} is too long")));
    }
    Ok(())
}

#[tonic::async_trait]
impl Registry for RegistryService {
    #[instrument(skip(self, request))]
    async fn get_device(
        &self,
        request: Request<GetDeviceRequest>,
    ) -> Result<Response<GetDeviceResponse>, Status> {
        let req = request.into_inner();
        if let Err(status) = validate_id(&req.device_id, "device_id") {
            record_rpc("GetDevice", "invalid_request");
            return Ok(Response::new(GetDeviceResponse {
                status: WireStatus::InvalidRequest as i32,
                device: None,
                message: status.message().to_string(),
            }));
        }

        match repository::get_device(&self.pool, &req.device_id).await {
            Ok(Some(row)) => {
                record_rpc("GetDevice", "success");
                Ok(Response::new(GetDeviceResponse {
                    status: WireStatus::Success as i32,
                    device: Some(Device {
                        device_id: row.device_id,
                        device_type: row.device_type,
                        patient_id: row.patient_id,
                        status: row.status,
                        metadata: json_object_to_string_map(&row.metadata),
                    }),
                    message: String::new(),
                }))
            }
            Ok(None) => {
                record_rpc("GetDevice", "not_found");
                Ok(Response::new(GetDeviceResponse {
                    status: WireStatus::NotFound as i32,
                    device: None,
                    message: format!("device {} not found", req.device_id),
                }))
            }
            Err(err) => {
                record_rpc("GetDevice", "internal_error");
                Ok(Response::new(GetDeviceResponse {
                    status: WireStatus::InternalError as i32,
                    device: None,
                    message: err.to_string(),
                }))
            }
        }
    }

    #[instrument(skip(self, request))]
    async fn get_patient(
        &self,
        request: Request<GetPatientRequest>,
    ) -> Result<Response<GetPatientResponse>, Status> {
        let req = request.into_inner();
        if let Err(status) = validate_id(&req.patient_id, "patient_id") {
            record_rpc("GetPatient", "invalid_request");
            return Ok(Response::new(GetPatientResponse {
                status: WireStatus::InvalidRequest as i32,
                patient: None,
                message: status.message().to_string(),
            }));
        }

        match repository::get_patient(&self.pool, &req.patient_id).await {
            Ok(Some(row)) => {
                record_rpc("GetPatient", "success");
                Ok(Response::new(GetPatientResponse {
                    status: WireStatus::Success as i32,
                    patient: Some(Patient {
                        patient_id: row.patient_id,
                        age: u32::try_from(row.age).unwrap_or(0),
                        sex: row.sex,
                        medical_conditions: row.medical_conditions,
                        medications: row.medications,
                        allergies: row.allergies,
                    }),
                    message: String::new(),
                }))
            }
            Ok(None) => {
                record_rpc("GetPatient", "not_found");
                Ok(Response::new(GetPatientResponse {
                    status: WireStatus::NotFound as i32,
                    patient: None,
                    message: format!("patient {} not found", req.patient_id),
                }))
            }
            Err(err) => {
                record_rpc("GetPatient", "internal_error");
                Ok(Response::new(GetPatientResponse {
                    status: WireStatus::InternalError as i32,
                    patient: None,
                    message: err.to_string(),
                }))
            }
        }
    }

    #[instrument(skip(self, request))]
    async fn get_threshold_profile(
        &self,
        request: Request<GetThresholdProfileRequest>,
    ) -> Result<Response<GetThresholdProfileResponse>, Status> {
        let req = request.into_inner();
        if let Err(status) = validate_id(&req.patient_id, "patient_id") {
            record_rpc("GetThresholdProfile", "invalid_request");
            return Ok(Response::new(GetThresholdProfileResponse {
                status: WireStatus::InvalidRequest as i32,
                thresholds: None,
                message: status.message().to_string(),
            }));
        }

        match repository::get_threshold_profile(&self.pool, &req.patient_id, req.device_id.as_deref())
            .await
        {
            Ok(Some(row)) => {
                record_rpc("GetThresholdProfile", "success");
                Ok(Response::new(GetThresholdProfileResponse {
                    status: WireStatus::Success as i32,
                    thresholds: Some(ThresholdProfile {
                        patient_id: row.patient_id,
                        device_id: row.device_id,
                        heart_rate: Some(Range { min: row.heart_rate_min, max: row.heart_rate_max }),
                        blood_pressure: Some(BloodPressureRange {
                            systolic: Some(Range { min: row.bp_systolic_min, max: row.bp_systolic_max }),
                            diastolic: Some(Range { min: row.bp_diastolic_min, max: row.bp_diastolic_max }),
                        }),
                        temperature: Some(Range { min: row.temperature_min, max: row.temperature_max }),
                        oxygen_saturation: Some(Range {
                            min: row.oxygen_saturation_min,
                            max: row.oxygen_saturation_max,
                        }),
                        respiratory_rate: Some(Range {
                            min: row.respiratory_rate_min,
                            max: row.respiratory_rate_max,
                        }),
                    }),
                    message: String::new(),
                }))
            }
            Ok(None) => {
                record_rpc("GetThresholdProfile", "not_found");
                Ok(Response::new(GetThresholdProfileResponse {
                    status: WireStatus::NotFound as i32,
                    thresholds: None,
                    message: format!("no threshold profile for patient {}", req.patient_id),
                }))
            }
            Err(err) => {
                record_rpc("GetThresholdProfile", "internal_error");
                Ok(Response::new(GetThresholdProfileResponse {
                    status: WireStatus::InternalError as i32,
                    thresholds: None,
                    message: err.to_string(),
                }))
            }
        }
    }
}

fn json_object_to_string_map(value: &serde_json::Value) -> std::collections::HashMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), v.as_str().map_or_else(|| v.to_string(), str::to_string)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn validate_id_rejects_empty() {
        assert!(validate_id("", "device_id").is_err());
    }

    #[test]
    fn validate_id_rejects_overlong() {
        let long = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(validate_id(&long, "device_id").is_err());
    }

    #[test]
    fn validate_id_accepts_normal_id() {
        assert!(validate_id("D1", "device_id").is_ok());
    }

    #[test]
    fn json_object_to_string_map_flattens_strings() {
        let value = serde_json::json!({"firmware": "1.2.3", "battery": 87});
        let map = json_object_to_string_map(&value);
        assert_eq!(map.get("firmware").map(String::as_str), Some("1.2.3"));
        assert_eq!(map.get("battery").map(String::as_str), Some("87"));
    }
}
