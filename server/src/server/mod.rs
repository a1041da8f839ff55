pub mod api;
pub mod router;
pub mod websocket;

use tokio::net::TcpListener;

use crate::app::SharedState;

/// Serve HTTP + WebSocket on an already-bound listener until the
/// shutdown token fires, then stop accepting and drain.
pub async fn serve(listener: TcpListener, state: SharedState) -> anyhow::Result<()> {
    let app = router::create_router(state.clone());
    let shutdown = state.shutdown_token().clone();

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
