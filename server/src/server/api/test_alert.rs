//! Alert submission endpoint.
//!
//! Resolves the event against the configured ruleset, merges explicit
//! request overrides on top of the resolved config, writes the audit
//! entry, then hands the instance to the queue.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use forge_db::alerts::EventType;
use forge_db::event_log::NewEventLogEntry;

use super::{db_err, err_json};
use crate::app::SharedState;
use crate::events::EventFacts;
use crate::queue::AlertSubmission;
use crate::resolver;

#[derive(Debug, Default, Deserialize)]
pub struct TestAlertRequest {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de_opt_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "crate::events::de_opt_stringish")]
    pub tier: Option<String>,
    pub message: Option<String>,
    #[serde(
        default,
        alias = "customValue",
        deserialize_with = "crate::events::de_opt_stringish"
    )]
    pub custom_value: Option<String>,
    pub platform: Option<String>,
    pub animation_in: Option<String>,
    pub animation_out: Option<String>,
    pub duration_ms: Option<i64>,
}

/// POST /api/test-alert
pub async fn submit(
    State(state): State<SharedState>,
    Json(body): Json<TestAlertRequest>,
) -> Result<Json<Value>, (axum::http::StatusCode, Json<Value>)> {
    let raw_type = body
        .event_type
        .as_deref()
        .ok_or_else(|| err_json(400, "type is required"))?;
    let event_type = EventType::parse(raw_type)
        .ok_or_else(|| err_json(400, &format!("unknown event type {raw_type:?}")))?;

    if let Some(duration_ms) = body.duration_ms {
        if !(1000..=60000).contains(&duration_ms) {
            return Err(err_json(
                400,
                &format!("duration_ms must be within 1000..=60000, got {duration_ms}"),
            ));
        }
    }

    let username = body.username.clone().unwrap_or_else(|| "TestUser".into());
    let platform = body.platform.clone().unwrap_or_else(|| "test".into());
    let facts = EventFacts {
        username: Some(username.clone()),
        display_name: body.display_name.clone(),
        amount: body.amount,
        tier: body.tier.clone(),
        message: body.message.clone(),
        custom_value: body.custom_value.clone(),
    };

    let resolved = resolver::resolve(state.db(), event_type, &facts).map_err(db_err)?;

    let log_entry = NewEventLogEntry {
        platform,
        event_type: event_type.as_str().to_string(),
        username: username.clone(),
        display_name: facts.display_name.clone().unwrap_or_else(|| username.clone()),
        amount: body.amount,
        message: body.message.clone(),
        metadata: serde_json::to_string(&json!({
            "tier": facts.tier,
            "custom_value": facts.custom_value,
            "source": "test-alert",
        }))
        .ok(),
        alert_fired: resolved.is_some(),
    };
    // The audit entry is written before dispatch.
    state.logger().record(log_entry);

    let Some(mut config) = resolved else {
        return Ok(Json(json!({
            "status": "no_match",
            "alertId": null,
            "queueLength": state.queue().length(),
        })));
    };

    // Explicit request overrides win over the resolved config.
    if let Some(animation_in) = body.animation_in {
        config.animation_in = animation_in;
    }
    if let Some(animation_out) = body.animation_out {
        config.animation_out = animation_out;
    }
    if let Some(duration_ms) = body.duration_ms {
        config.duration_ms = duration_ms;
    }

    let submission = AlertSubmission {
        instance_id: None,
        event_type: Some(event_type),
        username: Some(username),
        display_name: body.display_name,
        amount: body.amount,
        message: body.message,
        config,
    };

    match state.queue().enqueue(submission) {
        Some(alert_id) => Ok(Json(json!({
            "status": "queued",
            "alertId": alert_id,
            "queueLength": state.queue().length(),
        }))),
        None => Err(err_json(400, "alert submission failed validation")),
    }
}

/// POST /api/test-alert/clear
pub async fn clear(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "cleared": state.queue().clear() }))
}

/// GET /api/test-alert/status
pub async fn status(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "currentAlert": state.queue().current(),
        "queueLength": state.queue().length(),
    }))
}
