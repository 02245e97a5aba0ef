mod baseline;
mod config;
mod error;
mod grpc;
mod lua;
mod metrics;
mod scoring;
mod store;

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use common::observability::{init_metrics_recorder, init_tracing};
use config::Config;
use grpc::ScorerService;
use store::{BaselineStore, RedisBaselineStore};
use telemetry_proto::scorer::anomaly_detection_server::AnomalyDetectionServer;
use telemetry_protocol::shutdown::{drain_with_deadline, wait_for_shutdown_signal};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("scorer_service=info");
    info!("starting anomaly scorer service");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "failed to initialize metrics recorder");
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    info!(?config, "configuration loaded");

    let redis_store = match &config.redis_url {
        Some(url) => match RedisBaselineStore::connect(url).await {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(error = %e, "failed to connect to baseline cache, starting with in-process fallback only");
                None
            }
        },
        None => None,
    };
    let store = BaselineStore::new(redis_store);

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

    let grpc_addr: SocketAddr = config.grpc_bind_address.parse()?;
    let scorer_service = ScorerService::new(store, config.dedupe_by_event_id);
    info!(address = %grpc_addr, "scorer gRPC server listening");

    let grpc_shutdown = shutdown.clone();
    let grpc_task = tokio::spawn(async move {
        Server::builder()
            .add_service(AnomalyDetectionServer::new(scorer_service))
            .serve_with_shutdown(grpc_addr, async move { grpc_shutdown.cancelled().await })
            .await
    });

    wait_for_shutdown_signal(shutdown.clone()).await;

    let drained = drain_with_deadline(
        async {
            let _ = grpc_task.await;
            let _ = metrics_task.await;
        },
        telemetry_protocol::shutdown::default_shutdown_deadline(),
    )
    .await;

    if !drained {
        std::process::exit(1);
    }

    info!("scorer service shutdown complete");
    Ok(())
}
