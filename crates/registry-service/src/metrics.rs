//! Registry metrics definitions (spec §9.2).

use std::time::Duration;

use metrics::{counter, histogram};

/// Record a database query's latency and outcome.
///
/// Metric: `registry_db_query_duration_seconds`, `registry_db_queries_total`
/// Labels: `operation`, `table`, `status`
pub fn record_db_query(operation: &str, table: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    histogram!(
        "registry_db_query_duration_seconds",
        "operation" => operation.to_string(),
        "table" => table.to_string(),
    )
    .record(duration.as_secs_f64());

    counter!(
        "registry_db_queries_total",
        "operation" => operation.to_string(),
        "table" => table.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Record an RPC outcome.
///
/// Metric: `registry_rpc_requests_total`
/// Labels: `method`, `status`
pub fn record_rpc(method: &str, status: &str) {
    counter!("registry_rpc_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
}
