//! Scorer error taxonomy (spec §4.5, §7).

use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("cache error: {0}")]
    Cache(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model error: {0}")]
    Model(String),
}

impl From<ScorerError> for Status {
    fn from(err: ScorerError) -> Self {
        match err {
            ScorerError::Cache(msg) | ScorerError::Model(msg) => Status::internal(msg),
            ScorerError::InvalidRequest(msg) => Status::invalid_argument(msg),
        }
    }
}
