//! `AnomalyDetection` gRPC service implementation (spec §4.5).

use std::collections::HashMap;
use std::str::FromStr;

use common::types::EventId;
use telemetry_proto::scorer::anomaly_detection_server::AnomalyDetection;
use telemetry_proto::scorer::{
    MetricScore as WireMetricScore, ScoreVitalsRequest, ScoreVitalsResponse, Status as WireStatus,
};
use telemetry_protocol::dedupe::SeenIds;
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::{instrument, warn};

use crate::metrics::record_rpc;
use crate::scoring::{overall_risk, score_metric, score_metric_readonly, MetricScore};
use crate::store::BaselineStore;

/// Bound on the number of recently-seen event ids tracked for dedupe.
const DEDUPE_CAPACITY: usize = 10_000;

pub struct ScorerService {
    store: BaselineStore,
    dedupe: Option<Mutex<SeenIds>>,
}

impl ScorerService {
    /// `dedupe_by_event_id` resolves the open question in spec §9: whether
    /// duplicate submissions of the same `event_id` should be no-ops against
    /// the baseline. Left as a configuration knob rather than assumed.
    #[must_use]
    pub fn new(store: BaselineStore, dedupe_by_event_id: bool) -> Self {
        let dedupe = dedupe_by_event_id.then(|| Mutex::new(SeenIds::new(DEDUPE_CAPACITY)));
        Self { store, dedupe }
    }

    async fn is_duplicate(&self, event_id: Option<&str>) -> bool {
        let (Some(dedupe), Some(event_id)) = (&self.dedupe, event_id) else {
            return false;
        };
        match EventId::from_str(event_id) {
            Ok(id) => dedupe.lock().await.observe(id),
            Err(_) => {
                warn!(event_id, "scorer received non-UUID event_id, skipping dedupe check");
                false
            }
        }
    }
}

#[tonic::async_trait]
impl AnomalyDetection for ScorerService {
    #[instrument(skip(self, request))]
    async fn score_vitals(
        &self,
        request: Request<ScoreVitalsRequest>,
    ) -> Result<Response<ScoreVitalsResponse>, Status> {
        let req = request.into_inner();

        if req.patient_id.is_empty() {
            record_rpc("ScoreVitals", "invalid_request");
            return Ok(Response::new(ScoreVitalsResponse {
                status: WireStatus::InvalidRequest as i32,
                patient_id: req.patient_id,
                anomaly_scores: HashMap::new(),
                overall_risk_score: 0.0,
                metadata: HashMap::new(),
            }));
        }

        let duplicate = self.is_duplicate(req.event_id.as_deref()).await;

        let mut scores: HashMap<String, MetricScore> = HashMap::new();
        for vital in &req.vitals {
            let result = if duplicate {
                score_metric_readonly(&self.store, &req.patient_id, &vital.metric, vital.value, &vital.unit).await
            } else {
                score_metric(&self.store, &req.patient_id, &vital.metric, vital.value, &vital.unit).await
            };
            scores.insert(vital.metric.clone(), result);
        }

        let risk = overall_risk(&scores);

        let wire_scores = scores
            .iter()
            .map(|(metric, score)| {
                (
                    metric.clone(),
                    WireMetricScore { score: score.score, severity: severity_label(score.severity) },
                )
            })
            .collect();

        record_rpc("ScoreVitals", "success");
        Ok(Response::new(ScoreVitalsResponse {
            status: WireStatus::Success as i32,
            patient_id: req.patient_id,
            anomaly_scores: wire_scores,
            overall_risk_score: risk,
            metadata: HashMap::new(),
        }))
    }
}

fn severity_label(severity: telemetry_protocol::severity::Severity) -> String {
    use telemetry_protocol::severity::Severity;
    match severity {
        Severity::Ok => "normal",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::Warning => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
    .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use telemetry_protocol::severity::Severity;

    #[test]
    fn severity_label_matches_scorer_vocabulary() {
        assert_eq!(severity_label(Severity::Ok), "normal");
        assert_eq!(severity_label(Severity::Critical), "critical");
    }

    #[tokio::test]
    async fn score_vitals_rejects_empty_patient_id() {
        let service = ScorerService::new(BaselineStore::new(None), false);
        let response = service
            .score_vitals(Request::new(ScoreVitalsRequest {
                patient_id: String::new(),
                device_id: "D1".to_string(),
                vitals: vec![],
                event_id: None,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, WireStatus::InvalidRequest as i32);
    }

    #[tokio::test]
    async fn duplicate_event_id_does_not_mutate_baseline_when_dedupe_enabled() {
        let service = ScorerService::new(BaselineStore::new(None), true);
        let event_id = common::types::EventId::new().to_string();
        let request = || ScoreVitalsRequest {
            patient_id: "P1".to_string(),
            device_id: "D1".to_string(),
            vitals: vec![telemetry_proto::scorer::VitalInput {
                metric: "heart_rate".to_string(),
                value: 72.0,
                unit: "bpm".to_string(),
            }],
            event_id: Some(event_id.clone()),
        };

        let first = service.score_vitals(Request::new(request())).await.unwrap().into_inner();
        let second = service.score_vitals(Request::new(request())).await.unwrap().into_inner();
        assert_eq!(first.status, WireStatus::Success as i32);
        assert_eq!(second.status, WireStatus::Success as i32);
    }
}
