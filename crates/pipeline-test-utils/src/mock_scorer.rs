//! Mock Anomaly Scorer gRPC server for Rules Engine testing.
//!
//! Provides `MockScorer`, a configurable `AnomalyDetection` implementation,
//! and `TestScorerServer::spawn`, which serves it over a real loopback
//! socket.

use std::collections::HashMap;
use std::net::SocketAddr;

use telemetry_proto::scorer::anomaly_detection_server::{AnomalyDetection, AnomalyDetectionServer};
use telemetry_proto::scorer::{MetricScore, ScoreVitalsRequest, ScoreVitalsResponse, Status as WireStatus};
use tokio::task::JoinHandle;
use tonic::{Request, Response, Status};

/// A configured anomaly-scoring response, served for every request
/// regardless of the submitted vitals, or a forced transport failure.
#[derive(Debug, Clone, Default)]
pub struct MockScorer {
    scores: HashMap<String, MetricScore>,
    overall_risk_score: f64,
    unreachable: bool,
}

impl MockScorer {
    /// A mock that reports every present vital as `normal` with a zero score.
    #[must_use]
    pub fn quiet() -> Self {
        Self::default()
    }

    /// A mock that reports a fixed severity label for the given metric.
    #[must_use]
    pub fn with_score(mut self, metric: impl Into<String>, score: f64, severity: impl Into<String>) -> Self {
        self.scores.insert(metric.into(), MetricScore { score, severity: severity.into() });
        self
    }

    /// Set the overall risk score reported in the response.
    #[must_use]
    pub fn with_overall_risk_score(mut self, score: f64) -> Self {
        self.overall_risk_score = score;
        self
    }

    /// Make every RPC fail as if the scorer were unreachable.
    #[must_use]
    pub fn unreachable() -> Self {
        Self { unreachable: true, ..Default::default() }
    }
}

#[tonic::async_trait]
impl AnomalyDetection for MockScorer {
    async fn score_vitals(
        &self,
        request: Request<ScoreVitalsRequest>,
    ) -> Result<Response<ScoreVitalsResponse>, Status> {
        if self.unreachable {
            return Err(Status::unavailable("mock scorer unreachable"));
        }
        let req = request.into_inner();
        let mut anomaly_scores = HashMap::new();
        for vital in &req.vitals {
            let score = self.scores.get(&vital.metric).cloned().unwrap_or(MetricScore {
                score: 0.0,
                severity: "normal".to_string(),
            });
            anomaly_scores.insert(vital.metric.clone(), score);
        }

        Ok(Response::new(ScoreVitalsResponse {
            status: WireStatus::Success as i32,
            patient_id: req.patient_id,
            anomaly_scores,
            overall_risk_score: self.overall_risk_score,
            metadata: HashMap::new(),
        }))
    }
}

/// Test harness for spawning a `MockScorer` over a real loopback socket.
pub struct TestScorerServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestScorerServer {
    /// Spawn a mock scorer server bound to a random available port.
    ///
    /// # Panics
    /// Panics if the server fails to bind; acceptable in test-only code.
    pub async fn spawn(mock: MockScorer) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test scorer listener");
        let addr = listener.local_addr().expect("local addr");
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

        let handle = tokio::spawn(async move {
            if let Err(e) = tonic::transport::Server::builder()
                .add_service(AnomalyDetectionServer::new(mock))
                .serve_with_incoming(incoming)
                .await
            {
                eprintln!("test scorer server error: {e}");
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
