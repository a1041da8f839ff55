//! Health and WebSocket status endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app::SharedState;

/// GET /api/health
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "port": state.bound_port(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// GET /api/ws/status
pub async fn ws_status(State(state): State<SharedState>) -> Json<Value> {
    let (clients, total) = state.hub().counts();
    Json(json!({
        "namespaces": state.hub().namespace_paths(),
        "clients": clients,
        "totalClients": total,
    }))
}
