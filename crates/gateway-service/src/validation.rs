//! Shared input validation for both Gateway ingress surfaces (spec §4.1).

use chrono::{DateTime, Utc};
use common::types::parse_flexible_timestamp;
use telemetry_protocol::measurement::Measurement;

use crate::error::GatewayError;

/// Validate a submission common to the HTTP and RPC surfaces: rejects empty
/// `device_id`, empty measurement lists, and malformed timestamps (spec
/// §4.1: "Input validation rejects payloads with no measurements, malformed
/// timestamps, or missing `device_id`").
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] on any of the three conditions above.
pub fn validate_submission(
    device_id: &str,
    raw_timestamp: &str,
    measurements: &[Measurement],
) -> Result<DateTime<Utc>, GatewayError> {
    if device_id.trim().is_empty() {
        return Err(GatewayError::Validation("device_id is required".to_string()));
    }

    if measurements.is_empty() {
        return Err(GatewayError::Validation("at least one measurement is required".to_string()));
    }

    parse_flexible_timestamp(raw_timestamp)
        .ok_or_else(|| GatewayError::Validation(format!("malformed timestamp: {raw_timestamp}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn measurement() -> Measurement {
        Measurement { metric: "heart_rate".to_string(), value: 72.0, unit: "bpm".to_string() }
    }

    #[test]
    fn rejects_missing_device_id() {
        let result = validate_submission("", "2024-01-15T10:30:00Z", &[measurement()]);
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn rejects_empty_measurements() {
        let result = validate_submission("D1", "2024-01-15T10:30:00Z", &[]);
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let result = validate_submission("D1", "not-a-timestamp", &[measurement()]);
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn accepts_well_formed_submission() {
        let result = validate_submission("D1", "2024-01-15T10:30:00Z", &[measurement()]);
        assert!(result.is_ok());
    }
}
