//! Background task loops: staging sweep.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::app::SharedState;

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Periodically remove staged files that outlived the retention window.
/// Runs once at startup, then every `sweep_interval`.
pub async fn staging_sweep_loop(state: SharedState) {
    let shutdown_token = state.shutdown_token().clone();
    let interval = state.config().sweep_interval();

    loop {
        sweep_once(&state).await;
        if sleep_or_cancel(&shutdown_token, interval).await {
            tracing::info!("Staging sweep loop stopped (shutdown)");
            return;
        }
    }
}

async fn sweep_once(state: &SharedState) {
    let staging = state.staging().clone();
    let max_age = state.config().temp_retention();
    match tokio::task::spawn_blocking(move || staging.sweep(max_age)).await {
        Ok(Ok(report)) => tracing::debug!(removed = report.removed, failed = report.failed, "Staging sweep finished"),
        Ok(Err(e)) => tracing::warn!("Staging sweep failed: {e}"),
        Err(e) => tracing::warn!("Staging sweep task panicked: {e}"),
    }
}
