//! Device-verification client for the Registry's `GetDevice` RPC (spec §4.1).
//!
//! The Gateway only ever calls `GetDevice`; patient and threshold lookups
//! belong to the Enricher (spec §4.3).

use std::time::Duration;

use telemetry_proto::registry::registry_client::RegistryClient;
use telemetry_proto::registry::{GetDeviceRequest, Status as WireStatus};
use tonic::transport::Channel;
use tracing::warn;

/// Outcome of a device-verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The Registry confirmed the device is registered.
    Known,
    /// The Registry confirmed the device does not exist.
    NotFound,
    /// The Registry could not be reached or returned an internal error;
    /// the Gateway fails open and treats the submission as accepted
    /// (spec §4.1: "If Registry is unreachable, the Gateway fails open").
    Unreachable,
}

/// Thin wrapper around the generated Registry gRPC client.
pub struct RegistryVerifier {
    client: RegistryClient<Channel>,
    timeout: Duration,
}

impl RegistryVerifier {
    /// Connect to the Registry at `endpoint`. Connection is lazy: `tonic`
    /// only dials on first use, so this never blocks startup.
    ///
    /// # Errors
    ///
    /// Returns a transport error if `endpoint` cannot be parsed as a URI.
    pub fn connect(endpoint: &str, timeout_ms: u64) -> Result<Self, tonic::transport::Error> {
        let channel = Channel::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self { client: RegistryClient::new(channel), timeout: Duration::from_millis(timeout_ms) })
    }

    /// Verify that `device_id` is registered, failing open on any
    /// reachability problem.
    pub async fn verify(&self, device_id: &str) -> VerificationOutcome {
        let mut request = tonic::Request::new(GetDeviceRequest { device_id: device_id.to_string() });
        request.set_timeout(self.timeout);

        match self.client.clone().get_device(request).await {
            Ok(response) => {
                let body = response.into_inner();
                if body.status == WireStatus::Success as i32 {
                    VerificationOutcome::Known
                } else if body.status == WireStatus::NotFound as i32 {
                    VerificationOutcome::NotFound
                } else {
                    warn!(device_id, status = body.status, "registry returned non-success status");
                    VerificationOutcome::Unreachable
                }
            }
            Err(e) => {
                warn!(device_id, error = %e, "registry unreachable, failing open");
                VerificationOutcome::Unreachable
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_device_verifies_as_known() {
        let mock = pipeline_test_utils::MockRegistry::builder().known_device("D1", Some("P1"));
        let server = pipeline_test_utils::TestRegistryServer::spawn(mock).await;
        let verifier = RegistryVerifier::connect(&server.endpoint(), 1_000).expect("connect");

        assert_eq!(verifier.verify("D1").await, VerificationOutcome::Known);
    }

    #[tokio::test]
    async fn unregistered_device_verifies_as_not_found() {
        let server = pipeline_test_utils::TestRegistryServer::spawn(pipeline_test_utils::MockRegistry::builder()).await;
        let verifier = RegistryVerifier::connect(&server.endpoint(), 1_000).expect("connect");

        assert_eq!(verifier.verify("missing").await, VerificationOutcome::NotFound);
    }

    #[tokio::test]
    async fn unreachable_registry_fails_open() {
        let server = pipeline_test_utils::TestRegistryServer::spawn(pipeline_test_utils::MockRegistry::unreachable()).await;
        let verifier = RegistryVerifier::connect(&server.endpoint(), 1_000).expect("connect");

        assert_eq!(verifier.verify("D1").await, VerificationOutcome::Unreachable);
    }
}
