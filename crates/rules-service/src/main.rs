mod alert;
mod config;
mod metrics;
mod rules;
mod scorer_client;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use common::observability::{init_metrics_recorder, init_tracing};
use config::Config;
use metrics::{record_alert, record_anomaly_degraded, record_processed};
use rdkafka::message::Message;
use scorer_client::{ScorerClient, ScoringResult};
use telemetry_protocol::broker::{build_consumer, run_consumer_loop, EventProducer, HandleOutcome};
use telemetry_protocol::envelope::{EnrichedTelemetry, EventType};
use telemetry_protocol::shutdown::{drain_with_deadline, wait_for_shutdown_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("rules_service=info");
    info!("starting rules engine");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "failed to initialize metrics recorder");
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    info!(?config, "configuration loaded");

    let producer = Arc::new(EventProducer::new(&config.bootstrap_servers, &config.client_id)?);
    let scorer = Arc::new(ScorerClient::connect(&config.scorer_endpoint, config.scorer_timeout_ms)?);
    let consumer = build_consumer(&config.bootstrap_servers, &config.consumer_group, EventType::Enriched.topic())?;

    let shutdown = CancellationToken::new();

    let metrics_addr: SocketAddr = config.metrics_bind_address.parse()?;
    let metrics_app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );
    let metrics_shutdown = shutdown.clone();
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    let metrics_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_app)
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await
        {
            error!(error = %e, "metrics server exited with error");
        }
    });

    let poison_limit = config.poison_limit;
    let hr_very_high = config.hr_very_high;
    let spo2_low = config.spo2_low;
    let consumer_shutdown = shutdown.clone();
    let consumer_task = tokio::spawn(async move {
        run_consumer_loop(consumer, consumer_shutdown, poison_limit, move |msg| {
            let producer = producer.clone();
            let scorer = scorer.clone();
            async move {
                let Some(payload) = msg.payload() else {
                    record_processed("poison");
                    return HandleOutcome::Poison(common::error::PipelineError::Validation(
                        "empty payload".to_string(),
                    ));
                };

                let enriched: EnrichedTelemetry = match serde_json::from_slice(payload) {
                    Ok(enriched) => enriched,
                    Err(e) => {
                        warn!(error = %e, "failed to deserialize enriched telemetry, treating as poison");
                        record_processed("poison");
                        return HandleOutcome::Poison(common::error::PipelineError::Serialization(e.to_string()));
                    }
                };

                let device_id = enriched.device_id.clone();

                let (triggered, scoring) = if enriched.orphan {
                    (Vec::new(), ScoringResult { scores: std::collections::HashMap::new(), overall_risk_score: 0.0, degraded: false })
                } else {
                    let patient_id = enriched.patient_id.clone().unwrap_or_default();
                    let scoring = scorer
                        .score(&patient_id, &device_id, &enriched.vitals, Some(enriched.envelope.event_id.to_string()))
                        .await;
                    if scoring.degraded {
                        record_anomaly_degraded();
                    }
                    let triggered = rules::evaluate(&enriched.vitals, enriched.thresholds.as_ref(), hr_very_high, spo2_low);
                    (triggered, scoring)
                };

                let (scored, alert) = alert::build(&enriched, triggered, scoring);

                let scored_result = producer.publish(EventType::Scored.topic(), &device_id, &scored).await;
                let alert_result = match &alert {
                    Some(alert) => Some(producer.publish(EventType::Alert.topic(), &device_id, alert).await),
                    None => None,
                };

                let alert_failed = alert_result.as_ref().is_some_and(std::result::Result::is_err);
                if scored_result.is_err() || alert_failed {
                    record_processed("retry");
                    let err = scored_result
                        .err()
                        .or_else(|| alert_result.and_then(std::result::Result::err))
                        .unwrap_or_else(|| common::error::PipelineError::Internal("unknown publish failure".to_string()));
                    return HandleOutcome::Retry(err);
                }

                if let Some(alert) = &alert {
                    record_alert(severity_label(alert.severity));
                }
                record_processed("success");
                HandleOutcome::Acked
            }
        })
        .await;
    });

    wait_for_shutdown_signal(shutdown.clone()).await;

    let drained = drain_with_deadline(
        async {
            let _ = consumer_task.await;
            let _ = metrics_task.await;
        },
        telemetry_protocol::shutdown::default_shutdown_deadline(),
    )
    .await;

    if !drained {
        std::process::exit(1);
    }

    info!("rules engine shutdown complete");
    Ok(())
}

fn severity_label(severity: telemetry_protocol::severity::Severity) -> &'static str {
    use telemetry_protocol::severity::Severity;
    match severity {
        Severity::Ok => "ok",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::Warning => "warning",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}
