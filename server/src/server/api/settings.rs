//! Settings endpoints over the key/value store.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{db_err, err_json, notify_config_changed};
use crate::app::SharedState;

#[derive(Debug, Deserialize)]
pub struct SettingBody {
    pub value: String,
}

/// GET /api/settings
pub async fn get_all(
    State(state): State<SharedState>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let settings = state.db().get_all_settings().map_err(db_err)?;
    Ok(Json(json!({ "settings": settings })))
}

/// GET /api/settings/{key}. Value is null when the key is absent.
pub async fn get_one(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let value = state.db().get_setting(&key).map_err(db_err)?;
    Ok(Json(json!({ "key": key, "value": value })))
}

/// PUT /api/settings/{key}
pub async fn set_one(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(body): Json<SettingBody>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    state.db().set_setting(&key, &body.value).map_err(db_err)?;

    // Settings can change runtime knobs; refresh the typed config.
    state
        .reload_config()
        .await
        .map_err(|e| err_json(500, &format!("Failed to reload config: {e}")))?;
    notify_config_changed(&state, "settings", &key);

    Ok(Json(json!({ "key": key, "value": body.value })))
}
