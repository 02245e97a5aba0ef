//! Graceful shutdown primitives shared by every consumer-loop binary
//! (spec §4.7 graceful shutdown, §5 cancellation/timeouts).

use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Wait for SIGTERM or SIGINT, then cancel `token` so every in-flight
/// consumer loop can stop fetching new messages and begin draining.
pub async fn wait_for_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received SIGINT, starting graceful shutdown"),
            Err(e) => error!(error = %e, "failed to listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, starting graceful shutdown");
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    token.cancel();
}

/// Drain `work`, a future representing all in-flight handlers and producer
/// flushes, until it completes or `deadline` elapses, whichever is first
/// (spec §4.7: "drain in-flight handlers with a deadline (default 30s)").
///
/// Returns `true` if `work` completed within the deadline, `false` if the
/// deadline was hit and callers should force-exit with a non-zero status.
pub async fn drain_with_deadline<F>(work: F, deadline: Duration) -> bool
where
    F: std::future::Future<Output = ()>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(()) => {
            info!("drain completed within deadline");
            true
        }
        Err(_) => {
            warn!(deadline_secs = deadline.as_secs(), "drain deadline exceeded, forcing exit");
            false
        }
    }
}

/// Default graceful-shutdown drain deadline (spec §4.7, §5).
#[must_use]
pub fn default_shutdown_deadline() -> Duration {
    Duration::from_secs(30)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_completes_before_deadline() {
        let completed = drain_with_deadline(async {}, Duration::from_secs(1)).await;
        assert!(completed);
    }

    #[tokio::test]
    async fn drain_times_out_when_work_hangs() {
        let completed = drain_with_deadline(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
            },
            Duration::from_millis(10),
        )
        .await;
        assert!(!completed);
    }

    #[test]
    fn default_deadline_matches_spec() {
        assert_eq!(default_shutdown_deadline(), Duration::from_secs(30));
    }
}
