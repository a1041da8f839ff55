//! REST API handlers grouped by domain.

pub mod alerts;
pub mod events;
pub mod settings;
pub mod status;
pub mod templates;
pub mod test_alert;
pub mod variations;

use axum::Json;
use serde_json::{json, Value};

use forge_db::DbError;

use crate::app::SharedState;
use crate::hub::NS_WIDGETS;

/// Standard error response.
pub fn err_json(status: u16, message: &str) -> (axum::http::StatusCode, Json<Value>) {
    (
        axum::http::StatusCode::from_u16(status)
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({ "status": "error", "error": message })),
    )
}

/// Map a store error onto the HTTP taxonomy.
pub fn db_err(e: DbError) -> (axum::http::StatusCode, Json<Value>) {
    let status = match &e {
        DbError::InvalidData(_) => 400,
        DbError::Forbidden(_) => 403,
        DbError::NotFound(_) => 404,
        DbError::Sqlite(_) | DbError::LockPoisoned => 500,
    };
    if status == 500 {
        tracing::error!(error = %e, "Store failure");
    }
    err_json(status, &e.to_string())
}

/// Tell live widgets that configuration changed under them.
pub fn notify_config_changed(state: &SharedState, scope: &str, id: &str) {
    state
        .hub()
        .broadcast(NS_WIDGETS, "config:changed", json!({ "scope": scope, "id": id }));
}
