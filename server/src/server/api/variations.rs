//! Variation CRUD endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use forge_db::variations::{NewVariation, VariationPatch};

use super::{db_err, notify_config_changed};
use crate::app::SharedState;

/// GET /api/alerts/{id}/variations
pub async fn list_for_alert(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    // Surface a 404 for a missing parent rather than an empty list.
    state.db().get_alert(&alert_id).map_err(db_err)?;
    let variations = state.db().list_variations(&alert_id).map_err(db_err)?;
    Ok(Json(json!(variations)))
}

/// POST /api/alerts/{id}/variations
pub async fn create(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
    Json(body): Json<NewVariation>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let variation = state
        .db()
        .create_variation(&alert_id, body)
        .map_err(db_err)?;
    notify_config_changed(&state, "variations", &variation.id);
    Ok(Json(json!(variation)))
}

/// PUT /api/variations/{id}
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<VariationPatch>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let variation = state.db().update_variation(&id, patch).map_err(db_err)?;
    notify_config_changed(&state, "variations", &variation.id);
    Ok(Json(json!(variation)))
}

/// DELETE /api/variations/{id}
pub async fn delete(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    state.db().delete_variation(&id).map_err(db_err)?;
    notify_config_changed(&state, "variations", &id);
    Ok(Json(json!({ "deleted": id })))
}
