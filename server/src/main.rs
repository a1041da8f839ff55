//! StreamForge sidecar server binary.
//!
//! Spawned by the desktop shell, which reads `SERVER_PORT=<n>` from
//! stdout. Logs go to stderr to keep stdout clean for that contract.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use streamforge_server::app::SharedState;
use streamforge_server::{background, bootstrap, lifecycle, server};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting StreamForge sidecar server");

    // Foundation (fatal on error).
    let (db, config, dir) = bootstrap::init_foundation()?;
    let state = SharedState::new(db, config, dir);

    // Port discovery, then the one-line stdout contract.
    let ports = state.config().await.ports();
    let listener = lifecycle::bind_listener(ports).await?;
    let port = listener.local_addr()?.port();
    state.set_bound_port(port);
    tracing::info!(port, "Listening on loopback");
    lifecycle::announce_port(port);

    // Background retention pruning.
    let s = state.clone();
    tokio::spawn(async move { background::event_log_prune_loop(s).await });

    // Serve until the shutdown token fires.
    let server_state = state.clone();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, server_state).await {
            tracing::error!("Server failed: {e}");
        }
    });

    lifecycle::shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    // Stop accepting, flush the store, tear down sessions, then give
    // in-flight responses a bounded drain window.
    state.shutdown_token().cancel();
    state.queue().shutdown();
    if let Err(e) = state.db().checkpoint() {
        tracing::warn!(error = %e, "WAL checkpoint on shutdown failed");
    }
    state.hub().close_all();

    if tokio::time::timeout(DRAIN_TIMEOUT, server_task).await.is_err() {
        tracing::warn!("Drain timeout exceeded, forcing exit");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
