//! Tracing and metrics bootstrap shared by every service binary (spec §9.2).
//!
//! Every binary calls [`init_tracing`] once at startup, then
//! [`init_metrics_recorder`] before any `metrics::counter!`/`histogram!`
//! call is reached, mirroring the reference architecture's service
//! `main.rs` sequencing (tracing first, then the Prometheus recorder).

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global `tracing` subscriber with an `EnvFilter` (default
/// `info`, override via `RUST_LOG`) and JSON-structured output.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the process-global Prometheus recorder. Must be called exactly
/// once per process, before any metrics are recorded.
///
/// # Errors
///
/// Returns an error string if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install Prometheus recorder: {e}"))
}
