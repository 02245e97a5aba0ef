//! Mock Registry gRPC server for Enricher/Gateway testing.
//!
//! Provides `MockRegistry`, a configurable `Registry` implementation, and
//! `TestRegistryServer::spawn`, which serves it over a real loopback
//! socket so client code under test exercises the actual tonic transport.

use std::collections::HashMap;
use std::net::SocketAddr;

use telemetry_proto::registry::registry_server::{Registry, RegistryServer};
use telemetry_proto::registry::{
    BloodPressureRange, Device, GetDeviceRequest, GetDeviceResponse, GetPatientRequest,
    GetPatientResponse, GetThresholdProfileRequest, GetThresholdProfileResponse, Patient, Range,
    Status as WireStatus, ThresholdProfile,
};
use tokio::task::JoinHandle;
use tonic::{Request, Response, Status};

/// A configured device/patient/threshold record set, served verbatim.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    devices: HashMap<String, Option<String>>,
    patients: HashMap<String, (u32, String)>,
    thresholds: HashMap<String, ThresholdProfile>,
    unreachable: bool,
}

impl MockRegistry {
    /// Start building a `MockRegistry` with no known devices or patients.
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Register a device id, optionally associated with a patient id.
    #[must_use]
    pub fn known_device(mut self, device_id: impl Into<String>, patient_id: Option<&str>) -> Self {
        self.devices.insert(device_id.into(), patient_id.map(str::to_string));
        self
    }

    /// Register a patient's demographic summary.
    #[must_use]
    pub fn known_patient(mut self, patient_id: impl Into<String>, age: u32, sex: impl Into<String>) -> Self {
        self.patients.insert(patient_id.into(), (age, sex.into()));
        self
    }

    /// Register a threshold profile for a patient.
    #[must_use]
    pub fn known_thresholds(mut self, patient_id: impl Into<String>, profile: ThresholdProfile) -> Self {
        self.thresholds.insert(patient_id.into(), profile);
        self
    }

    /// Make every RPC fail as if the registry were unreachable (transport
    /// error), for exercising fail-open / non-fatal-degradation paths.
    #[must_use]
    pub fn unreachable() -> Self {
        Self { unreachable: true, ..Default::default() }
    }
}

fn lenient_range(min: f64, max: f64) -> Range {
    Range { min, max }
}

/// A wide-open threshold profile fixture for use with `known_thresholds`.
#[must_use]
pub fn lenient_wire_thresholds(patient_id: &str) -> ThresholdProfile {
    ThresholdProfile {
        patient_id: patient_id.to_string(),
        device_id: None,
        heart_rate: lenient_range(40.0, 140.0),
        blood_pressure: BloodPressureRange {
            systolic: lenient_range(80.0, 160.0),
            diastolic: lenient_range(40.0, 100.0),
        },
        temperature: lenient_range(90.0, 104.0),
        oxygen_saturation: lenient_range(88.0, 100.0),
        respiratory_rate: lenient_range(8.0, 30.0),
    }
}

#[tonic::async_trait]
impl Registry for MockRegistry {
    async fn get_device(&self, request: Request<GetDeviceRequest>) -> Result<Response<GetDeviceResponse>, Status> {
        if self.unreachable {
            return Err(Status::unavailable("mock registry unreachable"));
        }
        let device_id = request.into_inner().device_id;
        match self.devices.get(&device_id) {
            Some(patient_id) => Ok(Response::new(GetDeviceResponse {
                status: WireStatus::Success as i32,
                device: Some(Device {
                    device_id: device_id.clone(),
                    device_type: "wearable".to_string(),
                    patient_id: patient_id.clone(),
                    status: "active".to_string(),
                    metadata: HashMap::new(),
                }),
                message: String::new(),
            })),
            None => Ok(Response::new(GetDeviceResponse {
                status: WireStatus::NotFound as i32,
                device: None,
                message: "device not found".to_string(),
            })),
        }
    }

    async fn get_patient(&self, request: Request<GetPatientRequest>) -> Result<Response<GetPatientResponse>, Status> {
        if self.unreachable {
            return Err(Status::unavailable("mock registry unreachable"));
        }
        let patient_id = request.into_inner().patient_id;
        match self.patients.get(&patient_id) {
            Some((age, sex)) => Ok(Response::new(GetPatientResponse {
                status: WireStatus::Success as i32,
                patient: Some(Patient {
                    patient_id: patient_id.clone(),
                    age: *age,
                    sex: sex.clone(),
                    medical_conditions: Vec::new(),
                    medications: Vec::new(),
                    allergies: Vec::new(),
                }),
                message: String::new(),
            })),
            None => Ok(Response::new(GetPatientResponse {
                status: WireStatus::NotFound as i32,
                patient: None,
                message: "patient not found".to_string(),
            })),
        }
    }

    async fn get_threshold_profile(
        &self,
        request: Request<GetThresholdProfileRequest>,
    ) -> Result<Response<GetThresholdProfileResponse>, Status> {
        if self.unreachable {
            return Err(Status::unavailable("mock registry unreachable"));
        }
        let patient_id = request.into_inner().patient_id;
        match self.thresholds.get(&patient_id) {
            Some(profile) => Ok(Response::new(GetThresholdProfileResponse {
                status: WireStatus::Success as i32,
                thresholds: Some(profile.clone()),
                message: String::new(),
            })),
            None => Ok(Response::new(GetThresholdProfileResponse {
                status: WireStatus::NotFound as i32,
                thresholds: None,
                message: "thresholds not found".to_string(),
            })),
        }
    }
}

/// Test harness for spawning a `MockRegistry` over a real loopback socket.
pub struct TestRegistryServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestRegistryServer {
    /// Spawn a mock registry server bound to a random available port.
    ///
    /// # Panics
    /// Panics if the server fails to bind; acceptable in test-only code.
    pub async fn spawn(mock: MockRegistry) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test registry listener");
        let addr = listener.local_addr().expect("local addr");
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

        let handle = tokio::spawn(async move {
            if let Err(e) = tonic::transport::Server::builder()
                .add_service(RegistryServer::new(mock))
                .serve_with_incoming(incoming)
                .await
            {
                eprintln!("test registry server error: {e}");
            }
        });

        Self { addr, _handle: handle }
    }

    /// The `http://host:port` endpoint this server is listening on.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }
}
