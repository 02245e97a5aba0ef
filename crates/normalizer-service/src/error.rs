//! Normalizer error taxonomy (spec §4.2).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    /// Input payload could not be deserialized as `RawTelemetry`; poison,
    /// never retried.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Publish to the `normalized` topic failed after retries.
    #[error("publish failed: {0}")]
    Publish(String),
}
