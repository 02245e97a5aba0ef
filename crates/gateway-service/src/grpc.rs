//! `TelemetryGateway.SendMeasurements` RPC ingress (spec §6 Gateway RPC).

use std::sync::Arc;

use telemetry_proto::gateway::telemetry_gateway_server::TelemetryGateway;
use telemetry_proto::gateway::{SendMeasurementsRequest, SendMeasurementsResponse, Status as WireStatus};
use telemetry_protocol::measurement::Measurement;
use tonic::{Request, Response, Status};
use tracing::{instrument, warn};

use crate::error::GatewayError;
use crate::ingest::IngestService;
use crate::metrics::record_rpc_request;

pub struct GatewayRpcService {
    ingest: Arc<IngestService>,
}

impl GatewayRpcService {
    #[must_use]
    pub fn new(ingest: Arc<IngestService>) -> Self {
        Self { ingest }
    }
}

#[tonic::async_trait]
impl TelemetryGateway for GatewayRpcService {
    #[instrument(skip(self, request))]
    async fn send_measurements(
        &self,
        request: Request<SendMeasurementsRequest>,
    ) -> Result<Response<SendMeasurementsResponse>, Status> {
        let req = request.into_inner();
        let measurements: Vec<Measurement> = req
            .measurements
            .into_iter()
            .map(|m| Measurement { metric: m.metric, value: m.value, unit: m.unit })
            .collect();

        let metadata = (!req.device_metadata.is_empty()).then(|| {
            req.device_metadata
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect()
        });

        match self.ingest.ingest(&req.device_id, &req.timestamp, measurements, metadata).await {
            Ok(event_id) => {
                record_rpc_request("success");
                Ok(Response::new(SendMeasurementsResponse {
                    version: req.version,
                    status: WireStatus::Success as i32,
                    message: None,
                    event_id: Some(event_id.to_string()),
                    timestamp: common::types::to_iso8601_millis(chrono::Utc::now()),
                }))
            }
            Err(err @ GatewayError::Validation(_)) => {
                record_rpc_request("validation_error");
                Ok(Response::new(rejected(req.version, WireStatus::ValidationError, &err)))
            }
            Err(err @ GatewayError::DeviceNotFound(_)) => {
                record_rpc_request("device_not_found");
                Ok(Response::new(rejected(req.version, WireStatus::DeviceNotFound, &err)))
            }
            Err(err @ GatewayError::Internal(_)) => {
                warn!(error = %err, "telemetry ingestion failed internally");
                record_rpc_request("internal_error");
                Ok(Response::new(rejected(req.version, WireStatus::InternalError, &err)))
            }
        }
    }
}

fn rejected(version: String, status: WireStatus, err: &GatewayError) -> SendMeasurementsResponse {
    SendMeasurementsResponse {
        version,
        status: status as i32,
        message: Some(err.to_string()),
        event_id: None,
        timestamp: common::types::to_iso8601_millis(chrono::Utc::now()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn rejected_carries_requested_version_and_no_event_id() {
        let response =
            rejected("1.0.0".to_string(), WireStatus::ValidationError, &GatewayError::Validation("bad".to_string()));
        assert_eq!(response.version, "1.0.0");
        assert_eq!(response.status, WireStatus::ValidationError as i32);
        assert!(response.event_id.is_none());
    }
}
