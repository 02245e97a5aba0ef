//! Gateway error taxonomy (spec §4.1).

use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Payload had no measurements, a malformed timestamp, or no device id.
    #[error("validation error: {0}")]
    Validation(String),

    /// Device verification was attempted and the Registry reported the
    /// device does not exist.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Publish to the broker failed after retries.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(msg) => Status::invalid_argument(msg),
            GatewayError::DeviceNotFound(msg) => Status::not_found(msg),
            GatewayError::Internal(msg) => Status::internal(msg),
        }
    }
}
