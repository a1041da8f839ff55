//! Background task loops.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::app::SharedState;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const STARTUP_DELAY: Duration = Duration::from_secs(60);

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Hourly event-log retention pruning.
pub async fn event_log_prune_loop(state: SharedState) {
    let shutdown_token = state.shutdown_token().clone();

    if sleep_or_cancel(&shutdown_token, STARTUP_DELAY).await {
        tracing::info!("Event log prune loop stopped (shutdown)");
        return;
    }

    loop {
        let retention_days = state.config().await.event_log_retention_days;
        let deleted = state.logger().prune_older_than_days(retention_days);
        if deleted > 0 {
            tracing::info!(deleted, retention_days, "Pruned old event log entries");
        }

        if sleep_or_cancel(&shutdown_token, PRUNE_INTERVAL).await {
            tracing::info!("Event log prune loop stopped (shutdown)");
            return;
        }
    }
}
