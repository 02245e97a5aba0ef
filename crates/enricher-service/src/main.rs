mod config;
mod enrich;
mod metrics;
mod registry_client;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use common::observability::{init_metrics_recorder, init_tracing};
use config::Config;
use metrics::{record_orphan, record_processed};
use rdkafka::message::Message;
use registry_client::RegistryClient;
use telemetry_protocol::broker::{build_consumer, run_consumer_loop, EventProducer, HandleOutcome};
use telemetry_protocol::envelope::{EventType, NormalizedTelemetry};
use telemetry_protocol::shutdown::{drain_with_deadline, wait_for_shutdown_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("enricher_service=info");
    info!("starting enricher");

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
    let registry = Arc::new(RegistryClient::connect(&config.registry_endpoint, config.registry_timeout_ms)?);
    let consumer =
        build_consumer(&config.bootstrap_servers, &config.consumer_group, EventType::Normalized.topic())?;

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
    let consumer_shutdown = shutdown.clone();
    let consumer_task = tokio::spawn(async move {
        run_consumer_loop(consumer, consumer_shutdown, poison_limit, move |msg| {
            let producer = producer.clone();
            let registry = registry.clone();
            async move {
                let Some(payload) = msg.payload() else {
                    record_processed("poison");
                    return HandleOutcome::Poison(common::error::PipelineError::Validation(
                        "empty payload".to_string(),
                    ));
                };

                let normalized: NormalizedTelemetry = match serde_json::from_slice(payload) {
                    Ok(normalized) => normalized,
                    Err(e) => {
                        warn!(error = %e, "failed to deserialize normalized telemetry, treating as poison");
                        record_processed("poison");
                        return HandleOutcome::Poison(common::error::PipelineError::Serialization(e.to_string()));
                    }
                };

                let device_id = normalized.device_id.clone();
                let enriched = enrich::enrich(&registry, normalized).await;
                if enriched.orphan {
                    record_orphan();
                }

                match producer.publish(EventType::Enriched.topic(), &device_id, &enriched).await {
                    Ok(()) => {
                        record_processed("success");
                        HandleOutcome::Acked
                    }
                    Err(e) => {
                        record_processed("retry");
                        HandleOutcome::Retry(e)
                    }
                }
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

    info!("enricher shutdown complete");
    Ok(())
}
