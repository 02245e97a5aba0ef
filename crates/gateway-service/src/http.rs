//! `POST /telemetry` HTTP ingress (spec §6 Gateway HTTP).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use telemetry_protocol::measurement::Measurement;
use tracing::warn;

use crate::error::GatewayError;
use crate::ingest::IngestService;
use crate::metrics::record_http_request;

#[derive(Debug, Deserialize)]
pub struct Metrics {
    pub hr: Option<f64>,
    pub spo2: Option<f64>,
    /// Temperature as submitted by the device's HTTP client. Always
    /// Fahrenheit on this surface (spec §9 Design Notes); never converted
    /// to Celsius here or anywhere downstream of the Gateway.
    pub temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub battery: Option<f64>,
    pub firmware: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryRequest {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub timestamp: String,
    pub metrics: Metrics,
    pub meta: Option<Meta>,
}

#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    pub success: bool,
    #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub message: String,
}

impl TelemetryRequest {
    fn into_measurements(&self) -> Vec<Measurement> {
        let mut measurements = Vec::with_capacity(3);
        if let Some(hr) = self.metrics.hr {
            measurements.push(Measurement { metric: "hr".to_string(), value: hr, unit: "bpm".to_string() });
        }
        if let Some(spo2) = self.metrics.spo2 {
            measurements.push(Measurement {
                metric: "spo2".to_string(),
                value: spo2,
                unit: "percent".to_string(),
            });
        }
        if let Some(temp) = self.metrics.temp {
            measurements.push(Measurement {
                metric: "temp".to_string(),
                value: temp,
                unit: "fahrenheit".to_string(),
            });
        }
        measurements
    }

    fn into_metadata(&self) -> Option<telemetry_protocol::envelope::DeviceMetadata> {
        let meta = self.meta.as_ref()?;
        let mut map = std::collections::HashMap::new();
        if let Some(battery) = meta.battery {
            map.insert("battery".to_string(), serde_json::json!(battery));
        }
        if let Some(firmware) = &meta.firmware {
            map.insert("firmware".to_string(), serde_json::json!(firmware));
        }
        Some(map)
    }
}

pub fn router(ingest: Arc<IngestService>) -> Router {
    Router::new().route("/telemetry", post(submit_telemetry)).with_state(ingest)
}

async fn submit_telemetry(
    State(ingest): State<Arc<IngestService>>,
    Json(request): Json<TelemetryRequest>,
) -> impl IntoResponse {
    let measurements = request.into_measurements();
    let metadata = request.into_metadata();

    match ingest.ingest(&request.device_id, &request.timestamp, measurements, metadata).await {
        Ok(event_id) => {
            record_http_request("success");
            (
                StatusCode::OK,
                Json(TelemetryResponse {
                    success: true,
                    event_id: Some(event_id.to_string()),
                    message: "accepted".to_string(),
                }),
            )
        }
        Err(err) => {
            let message = err.to_string();
            match err {
                GatewayError::Validation(_) => {
                    record_http_request("validation_error");
                    (StatusCode::BAD_REQUEST, Json(TelemetryResponse { success: false, event_id: None, message }))
                }
                GatewayError::DeviceNotFound(_) => {
                    record_http_request("device_not_found");
                    (StatusCode::BAD_REQUEST, Json(TelemetryResponse { success: false, event_id: None, message }))
                }
                GatewayError::Internal(_) => {
                    warn!(error = %message, "telemetry ingestion failed internally");
                    record_http_request("internal_error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(TelemetryResponse { success: false, event_id: None, message }),
                    )
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn temperature_measurement_is_tagged_fahrenheit() {
        let request = TelemetryRequest {
            device_id: "D1".to_string(),
            timestamp: "2024-01-15T10:30:00.000Z".to_string(),
            metrics: Metrics { hr: Some(72.0), spo2: Some(98.0), temp: Some(98.6) },
            meta: None,
        };
        let measurements = request.into_measurements();
        let temp = measurements.iter().find(|m| m.metric == "temp").unwrap();
        assert_eq!(temp.unit, "fahrenheit");
        assert_eq!(temp.value, 98.6);
    }

    #[test]
    fn absent_metrics_are_omitted() {
        let request = TelemetryRequest {
            device_id: "D1".to_string(),
            timestamp: "2024-01-15T10:30:00.000Z".to_string(),
            metrics: Metrics { hr: Some(72.0), spo2: None, temp: None },
            meta: None,
        };
        assert_eq!(request.into_measurements().len(), 1);
    }

    #[test]
    fn metadata_flattens_battery_and_firmware() {
        let request = TelemetryRequest {
            device_id: "D1".to_string(),
            timestamp: "2024-01-15T10:30:00.000Z".to_string(),
            metrics: Metrics { hr: None, spo2: None, temp: None },
            meta: Some(Meta { battery: Some(87.0), firmware: Some("1.2.3".to_string()) }),
        };
        let metadata = request.into_metadata().unwrap();
        assert_eq!(metadata.get("firmware").unwrap(), "1.2.3");
    }
}
