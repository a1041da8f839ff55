//! Event log query endpoints. Reads go through the EventLogger so a
//! broken audit store degrades to empty results rather than errors.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use forge_db::event_log::EventLogFilter;

use crate::app::SharedState;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: String,
    pub to: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PruneBody {
    /// Explicit cutoff; defaults to the retention window when absent.
    pub before: Option<String>,
}

/// GET /api/events
pub async fn list(
    State(state): State<SharedState>,
    Query(filter): Query<EventLogFilter>,
) -> Json<Value> {
    let events = state.logger().list(&filter);
    Json(json!({ "events": events, "count": events.len() }))
}

/// GET /api/events/range
pub async fn range(
    State(state): State<SharedState>,
    Query(query): Query<RangeQuery>,
) -> Json<Value> {
    let events = state
        .logger()
        .list_range(&query.from, &query.to, query.limit);
    Json(json!({ "events": events, "count": events.len() }))
}

/// POST /api/events/prune
pub async fn prune(
    State(state): State<SharedState>,
    body: Option<Json<PruneBody>>,
) -> Json<Value> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let deleted = match body.before {
        Some(cutoff) => state.logger().prune_before(&cutoff),
        None => {
            let days = state.config().await.event_log_retention_days;
            state.logger().prune_older_than_days(days)
        }
    };
    Json(json!({ "deleted": deleted }))
}
