//! Inbound client event routing.
//!
//! The queue ack is the only event with server-side state; everything
//! else is a relay described by `RELAYS` so the Hub stays data-driven.
//! Unknown events are dropped, and nothing in here may panic into the
//! socket task.

use serde_json::Value;

use crate::app::SharedState;
use crate::events::ClientMessage;
use crate::hub::{NS_ALERTS, NS_CHAT, NS_DASHBOARD, NS_WIDGETS};

/// (source namespace, inbound event) → (target namespace, outbound event)
struct Relay {
    source_ns: &'static str,
    event: &'static str,
    target_ns: &'static str,
    forward_as: &'static str,
}

const RELAYS: &[Relay] = &[
    Relay {
        source_ns: NS_ALERTS,
        event: "alert:pause",
        target_ns: NS_ALERTS,
        forward_as: "alert:paused",
    },
    Relay {
        source_ns: NS_CHAT,
        event: "chat:clear",
        target_ns: NS_CHAT,
        forward_as: "chat:clear",
    },
    Relay {
        source_ns: NS_CHAT,
        event: "chat:delete",
        target_ns: NS_CHAT,
        forward_as: "chat:delete",
    },
    Relay {
        source_ns: NS_WIDGETS,
        event: "config:changed",
        target_ns: NS_WIDGETS,
        forward_as: "config:changed",
    },
    Relay {
        source_ns: NS_DASHBOARD,
        event: "config:changed",
        target_ns: NS_WIDGETS,
        forward_as: "config:changed",
    },
    // Test path: the dashboard can push a trigger payload straight to
    // the alert overlays, bypassing the queue.
    Relay {
        source_ns: NS_DASHBOARD,
        event: "alert:trigger",
        target_ns: NS_ALERTS,
        forward_as: "alert:trigger",
    },
];

/// Route one raw client frame. Malformed frames and unknown events are
/// logged at debug level and dropped.
pub fn handle_client_message(state: &SharedState, ns: &str, socket_id: &str, raw: &str) {
    let msg: ClientMessage = match serde_json::from_str(raw) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(namespace = ns, socket_id, error = %e, "Dropping malformed frame");
            return;
        }
    };

    match (ns, msg.event.as_str()) {
        (NS_ALERTS, "alert:done") => {
            let instance_id = ack_instance_id(&msg.data);
            state.queue().complete(instance_id.as_deref());
        }
        (NS_ALERTS, "alert:skip") => {
            tracing::info!(socket_id, data = %msg.data, "Alert skip requested by overlay");
        }
        _ => {
            let relay = RELAYS
                .iter()
                .find(|r| r.source_ns == ns && r.event == msg.event);
            match relay {
                Some(relay) => {
                    state
                        .hub()
                        .broadcast(relay.target_ns, relay.forward_as, msg.data);
                }
                None => {
                    tracing::debug!(
                        namespace = ns,
                        socket_id,
                        event = %msg.event,
                        "Dropping unknown event"
                    );
                }
            }
        }
    }
}

/// Overlays historically acked with either `alertId` or `id`.
fn ack_instance_id(data: &Value) -> Option<String> {
    data.get("alertId")
        .or_else(|| data.get("id"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}
