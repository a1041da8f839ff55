//! Alert configuration CRUD endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use forge_db::alerts::{AlertPatch, EventType, NewAlert};

use super::{db_err, err_json, notify_config_changed};
use crate::app::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub enabled: Option<bool>,
}

/// GET /api/alerts
/// Without filters: every alert with its variations grouped.
/// With ?type= (and optionally &enabled=true): plain alert rows.
pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    match query.event_type {
        None => {
            let alerts = state.db().list_alerts().map_err(db_err)?;
            Ok(Json(json!(alerts)))
        }
        Some(raw) => {
            let event_type = EventType::parse(&raw)
                .ok_or_else(|| err_json(400, &format!("unknown event type {raw:?}")))?;
            let alerts = if query.enabled == Some(true) {
                state.db().list_enabled_alerts(event_type)
            } else {
                state.db().list_alerts_by_type(event_type)
            }
            .map_err(db_err)?;
            Ok(Json(json!(alerts)))
        }
    }
}

/// POST /api/alerts
pub async fn create(
    State(state): State<SharedState>,
    Json(body): Json<NewAlert>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let alert = state.db().create_alert(body).map_err(db_err)?;
    notify_config_changed(&state, "alerts", &alert.id);
    Ok(Json(json!(alert)))
}

/// GET /api/alerts/{id}
pub async fn get_one(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let alert = state.db().get_alert(&id).map_err(db_err)?;
    let variations = state.db().list_variations(&id).map_err(db_err)?;
    let mut body = json!(alert);
    body["variations"] = json!(variations);
    Ok(Json(body))
}

/// PUT /api/alerts/{id}
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<AlertPatch>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let alert = state.db().update_alert(&id, patch).map_err(db_err)?;
    notify_config_changed(&state, "alerts", &alert.id);
    Ok(Json(json!(alert)))
}

/// DELETE /api/alerts/{id}
pub async fn delete(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    state.db().delete_alert(&id).map_err(db_err)?;
    notify_config_changed(&state, "alerts", &id);
    Ok(Json(json!({ "deleted": id })))
}
