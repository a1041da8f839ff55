//! Template endpoints. Built-in rows reject writes with 403.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use forge_db::templates::{NewTemplate, TemplatePatch};

use super::{db_err, notify_config_changed};
use crate::app::SharedState;

/// GET /api/templates
pub async fn list(
    State(state): State<SharedState>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let templates = state.db().list_templates().map_err(db_err)?;
    Ok(Json(json!(templates)))
}

/// POST /api/templates
pub async fn create(
    State(state): State<SharedState>,
    Json(body): Json<NewTemplate>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let template = state.db().create_template(body).map_err(db_err)?;
    notify_config_changed(&state, "templates", &template.id);
    Ok(Json(json!(template)))
}

/// GET /api/templates/{id}
pub async fn get_one(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let template = state.db().get_template(&id).map_err(db_err)?;
    Ok(Json(json!(template)))
}

/// PUT /api/templates/{id}
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<TemplatePatch>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let template = state.db().update_template(&id, patch).map_err(db_err)?;
    notify_config_changed(&state, "templates", &template.id);
    Ok(Json(json!(template)))
}

/// DELETE /api/templates/{id}
pub async fn delete(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    state.db().delete_template(&id).map_err(db_err)?;
    notify_config_changed(&state, "templates", &id);
    Ok(Json(json!({ "deleted": id })))
}
