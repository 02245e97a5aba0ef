//! Registry error taxonomy and its mapping onto gRPC status (spec §4.6, §7).

use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        RegistryError::Database(err.to_string())
    }
}

impl From<RegistryError> for Status {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Database(msg) => Status::internal(msg),
            RegistryError::InvalidRequest(msg) => Status::invalid_argument(msg),
            RegistryError::NotFound(msg) => Status::not_found(msg),
        }
    }
}
