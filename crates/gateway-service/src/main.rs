mod config;
mod error;
mod grpc;
mod http;
mod ingest;
mod metrics;
mod registry_client;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use common::observability::{init_metrics_recorder, init_tracing};
use config::Config;
use grpc::GatewayRpcService;
use ingest::IngestService;
use registry_client::RegistryVerifier;
use telemetry_proto::gateway::telemetry_gateway_server::TelemetryGatewayServer;
use telemetry_protocol::broker::EventProducer;
use telemetry_protocol::shutdown::{drain_with_deadline, wait_for_shutdown_signal};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("gateway_service=info");
    info!("starting telemetry gateway");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "failed to initialize metrics recorder");
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    info!(?config, "configuration loaded");

    let producer = EventProducer::new(&config.bootstrap_servers, &config.client_id)?;

    let verifier = match &config.registry_endpoint {
        Some(endpoint) => match RegistryVerifier::connect(endpoint, config.registry_timeout_ms) {
            Ok(verifier) => Some(verifier),
            Err(e) => {
                warn!(error = %e, "failed to construct registry client, device verification disabled");
                None
            }
        },
        None => {
            if config.device_verification_enabled {
                warn!("device verification enabled but no registry endpoint configured, all submissions will be accepted");
            }
            None
        }
    };

    let ingest = Arc::new(IngestService::new(producer, verifier, config.device_verification_enabled));

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

    let http_addr: SocketAddr = config.http_bind_address.parse()?;
    let http_app = http::router(ingest.clone());
    info!(address = %http_addr, "gateway HTTP server listening");
    let http_shutdown = shutdown.clone();
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, http_app)
            .with_graceful_shutdown(async move { http_shutdown.cancelled().await })
            .await
        {
            error!(error = %e, "HTTP server exited with error");
        }
    });

    let grpc_addr: SocketAddr = config.grpc_bind_address.parse()?;
    let gateway_service = GatewayRpcService::new(ingest);
    info!(address = %grpc_addr, "gateway gRPC server listening");

    let grpc_shutdown = shutdown.clone();
    let grpc_task = tokio::spawn(async move {
        Server::builder()
            .add_service(TelemetryGatewayServer::new(gateway_service))
            .serve_with_shutdown(grpc_addr, async move { grpc_shutdown.cancelled().await })
            .await
    });

    wait_for_shutdown_signal(shutdown.clone()).await;

    let drained = drain_with_deadline(
        async {
            let _ = http_task.await;
            let _ = grpc_task.await;
            let _ = metrics_task.await;
        },
        telemetry_protocol::shutdown::default_shutdown_deadline(),
    )
    .await;

    if !drained {
        std::process::exit(1);
    }

    info!("gateway shutdown complete");
    Ok(())
}
