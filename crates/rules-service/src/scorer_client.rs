//! Anomaly Scorer client with graceful degradation (spec §4.4 step 1).

use std::collections::HashMap;
use std::time::Duration;

use telemetry_proto::scorer::anomaly_detection_client::AnomalyDetectionClient;
use telemetry_proto::scorer::{ScoreVitalsRequest, Status as WireStatus, VitalInput};
use telemetry_protocol::envelope::MetricScore;
use telemetry_protocol::measurement::Vital;
use telemetry_protocol::severity::Severity;
use tonic::transport::Channel;
use tracing::warn;

pub struct ScorerClient {
    client: AnomalyDetectionClient<Channel>,
    timeout: Duration,
}

/// Result of a scoring attempt: either the scorer's real output, or a
/// degraded all-zero result when it was unreachable.
pub struct ScoringResult {
    pub scores: HashMap<String, MetricScore>,
    pub overall_risk_score: f64,
    pub degraded: bool,
}

impl ScorerClient {
    /// # Errors
    ///
    /// Returns a transport error if `endpoint` cannot be parsed as a URI.
    pub fn connect(endpoint: &str, timeout_ms: u64) -> Result<Self, tonic::transport::Error> {
        let channel = Channel::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self { client: AnomalyDetectionClient::new(channel), timeout: Duration::from_millis(timeout_ms) })
    }

    /// Score `vitals` for `patient_id`/`device_id`. On gRPC failure or
    /// timeout, returns an all-zero degraded result rather than erroring
    /// (spec §4.4: "the event is still emitted").
    pub async fn score(
        &self,
        patient_id: &str,
        device_id: &str,
        vitals: &HashMap<String, Vital>,
        event_id: Option<String>,
    ) -> ScoringResult {
        let wire_vitals = vitals
            .iter()
            .map(|(metric, vital)| VitalInput {
                metric: metric.clone(),
                value: vital.value,
                unit: unit_label(vital.unit),
            })
            .collect();

        let mut request = tonic::Request::new(ScoreVitalsRequest {
            patient_id: patient_id.to_string(),
            device_id: device_id.to_string(),
            vitals: wire_vitals,
            event_id,
        });
        request.set_timeout(self.timeout);

        match self.client.clone().score_vitals(request).await {
            Ok(response) => {
                let body = response.into_inner();
                if body.status == WireStatus::Success as i32 {
                    let scores = body
                        .anomaly_scores
                        .into_iter()
                        .map(|(metric, score)| {
                            let severity = Severity::from_scorer_label(&score.severity);
                            (metric, MetricScore { score: score.score, severity })
                        })
                        .collect();
                    ScoringResult { scores, overall_risk_score: body.overall_risk_score, degraded: false }
                } else {
                    warn!(patient_id, status = body.status, "scorer returned non-success status, degrading");
                    degraded_result(vitals)
                }
            }
            Err(e) => {
                warn!(patient_id, error = %e, "scorer unreachable or timed out, degrading");
                degraded_result(vitals)
            }
        }
    }
}

fn degraded_result(vitals: &HashMap<String, Vital>) -> ScoringResult {
    let scores = vitals
        .keys()
        .map(|metric| (metric.clone(), MetricScore { score: 0.0, severity: Severity::Ok }))
        .collect();
    ScoringResult { scores, overall_risk_score: 0.0, degraded: true }
}

fn unit_label(unit: telemetry_protocol::measurement::TemperatureAwareUnit) -> String {
    use telemetry_protocol::measurement::TemperatureAwareUnit;
    match unit {
        TemperatureAwareUnit::Bpm => "bpm",
        TemperatureAwareUnit::Percent => "percent",
        TemperatureAwareUnit::Celsius => "celsius",
        TemperatureAwareUnit::Fahrenheit => "fahrenheit",
    }
    .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use telemetry_protocol::measurement::TemperatureAwareUnit;

    #[test]
    fn degraded_result_zeroes_every_present_metric() {
        let mut vitals = HashMap::new();
        vitals.insert(
            "heart_rate".to_string(),
            Vital { value: 72.0, unit: TemperatureAwareUnit::Bpm, timestamp: chrono::Utc::now() },
        );
        let result = degraded_result(&vitals);
        assert!(result.degraded);
        assert_eq!(result.scores["heart_rate"].score, 0.0);
        assert_eq!(result.overall_risk_score, 0.0);
    }

    fn sample_vitals() -> HashMap<String, Vital> {
        let mut vitals = HashMap::new();
        vitals.insert(
            "heart_rate".to_string(),
            Vital { value: 150.0, unit: TemperatureAwareUnit::Bpm, timestamp: chrono::Utc::now() },
        );
        vitals
    }

    #[tokio::test]
    async fn live_scorer_maps_severity_label_to_shared_ordering() {
        let mock = pipeline_test_utils::MockScorer::quiet()
            .with_score("heart_rate", 0.9, "critical")
            .with_overall_risk_score(0.9);
        let server = pipeline_test_utils::TestScorerServer::spawn(mock).await;
        let client = ScorerClient::connect(&server.endpoint(), 1_000).expect("connect");

        let result = client.score("P1", "D1", &sample_vitals(), None).await;

        assert!(!result.degraded);
        assert_eq!(result.scores["heart_rate"].severity, Severity::Critical);
        assert_eq!(result.overall_risk_score, 0.9);
    }

    #[tokio::test]
    async fn unreachable_scorer_degrades_rather_than_failing() {
        let server = pipeline_test_utils::TestScorerServer::spawn(pipeline_test_utils::MockScorer::unreachable()).await;
        let client = ScorerClient::connect(&server.endpoint(), 200).expect("connect");

        let result = client.score("P1", "D1", &sample_vitals(), None).await;

        assert!(result.degraded);
        assert_eq!(result.scores["heart_rate"].severity, Severity::Ok);
    }
}
