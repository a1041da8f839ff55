//! Single-consumer alert playback queue.
//!
//! Strict FIFO with exactly one instance in flight. Completion comes
//! from the overlay's `alert:done` ack or, failing that, from the
//! fallback timer armed at `duration_ms + 1000`. Whichever arrives
//! first advances the queue; the other is a no-op (the timer epoch is
//! bumped on every transition, so a late timer finds itself stale).
//! The queue lock is never held across a Hub emit.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use forge_db::alerts::EventType;
use forge_db::{new_id, now_iso};

use crate::hub::{Hub, NS_ALERTS, NS_DASHBOARD};
use crate::resolver::AlertSpec;

/// Grace period added to `duration_ms` before the fallback fires.
pub const FALLBACK_BUFFER_MS: u64 = 1000;

/// A resolved alert in flight. Never persisted; destroyed on ack or
/// fallback timeout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInstance {
    pub id: String,
    pub alert_config_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub username: String,
    pub display_name: String,
    pub amount: Option<f64>,
    pub message: String,
    pub timestamp: String,
    pub config: AlertSpec,
}

/// Enqueue input. `event_type` and a non-empty `username` are required;
/// everything else has a fill-in.
#[derive(Debug, Clone)]
pub struct AlertSubmission {
    pub instance_id: Option<String>,
    pub event_type: Option<EventType>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub amount: Option<f64>,
    pub message: Option<String>,
    pub config: AlertSpec,
}

#[derive(Clone)]
pub struct AlertQueue {
    core: Arc<QueueCore>,
}

struct QueueCore {
    hub: Arc<Hub>,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<AlertInstance>,
    current: Option<AlertInstance>,
    processing: bool,
    /// Bumped on every playback transition; a fallback task whose
    /// epoch no longer matches has been superseded by an ack.
    timer_epoch: u64,
    timer: Option<tokio::task::JoinHandle<()>>,
}

impl AlertQueue {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self {
            core: Arc::new(QueueCore {
                hub,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Validate, fill defaults, append. Starts playback immediately
    /// when the consumer is idle. Returns the instance id, or None on
    /// validation failure (nothing is enqueued).
    pub fn enqueue(&self, submission: AlertSubmission) -> Option<String> {
        let Some(event_type) = submission.event_type else {
            tracing::warn!("Enqueue rejected: missing event type");
            return None;
        };
        let username = match submission.username {
            Some(u) if !u.trim().is_empty() => u,
            _ => {
                tracing::warn!(event_type = event_type.as_str(), "Enqueue rejected: missing username");
                return None;
            }
        };

        let instance = AlertInstance {
            id: submission.instance_id.unwrap_or_else(new_id),
            alert_config_id: submission.config.alert_id.clone(),
            event_type,
            display_name: submission.display_name.unwrap_or_else(|| username.clone()),
            username,
            amount: submission.amount,
            message: submission
                .message
                .unwrap_or_else(|| event_type.default_template().to_string()),
            timestamp: now_iso(),
            config: submission.config,
        };
        let id = instance.id.clone();

        let idle = {
            let mut state = self.lock();
            state.pending.push_back(instance);
            !state.processing
        };
        tracing::debug!(instance_id = %id, "Alert enqueued");
        if idle {
            self.advance();
        } else {
            self.emit_status();
        }
        Some(id)
    }

    /// Consumer ack. Acks for anything other than the in-flight
    /// instance are ignored.
    pub fn complete(&self, instance_id: Option<&str>) {
        {
            let mut state = self.lock();
            let Some(current) = state.current.as_ref() else {
                tracing::debug!("Completion ack with no alert in flight");
                return;
            };
            if let Some(acked) = instance_id {
                if acked != current.id {
                    tracing::debug!(
                        acked,
                        current = %current.id,
                        "Stale completion ack ignored"
                    );
                    return;
                }
            }
            tracing::debug!(instance_id = %current.id, "Alert completed");
            state.timer_epoch += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.current = None;
            state.processing = false;
        }
        self.advance();
    }

    /// Pending count, excluding the in-flight instance.
    pub fn length(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn current(&self) -> Option<AlertInstance> {
        self.lock().current.clone()
    }

    /// Drop every pending instance. The in-flight one keeps playing.
    pub fn clear(&self) -> usize {
        let cleared = {
            let mut state = self.lock();
            let n = state.pending.len();
            state.pending.clear();
            n
        };
        if cleared > 0 {
            tracing::info!(cleared, "Pending alerts cleared");
        }
        self.emit_status();
        cleared
    }

    /// Cancel the fallback timer and drop pending work on shutdown.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.timer_epoch += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending.clear();
    }

    /// Pop the next instance when idle, emit it, arm the fallback.
    fn advance(&self) {
        let instance = {
            let mut state = self.lock();
            if state.processing {
                return;
            }
            let Some(instance) = state.pending.pop_front() else {
                drop(state);
                self.emit_status();
                return;
            };
            state.processing = true;
            state.current = Some(instance.clone());
            state.timer_epoch += 1;

            let epoch = state.timer_epoch;
            let queue = self.clone();
            let id = instance.id.clone();
            let delay = Duration::from_millis(
                instance.config.duration_ms.max(0) as u64 + FALLBACK_BUFFER_MS,
            );
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                queue.on_fallback(epoch, &id);
            }));
            instance
        };

        let payload = match serde_json::to_value(&instance) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize alert instance");
                json!({ "id": instance.id })
            }
        };
        let delivered = self.core.hub.broadcast(NS_ALERTS, "alert:trigger", payload);
        if delivered == 0 {
            tracing::warn!(
                instance_id = %instance.id,
                "alert:trigger emitted with no connected overlay clients"
            );
        }
        self.emit_status();
    }

    fn on_fallback(&self, epoch: u64, instance_id: &str) {
        {
            let mut state = self.lock();
            if state.timer_epoch != epoch {
                return;
            }
            let Some(current) = state.current.as_ref() else {
                return;
            };
            if current.id != instance_id {
                return;
            }
            tracing::warn!(
                instance_id,
                "No completion ack before fallback timeout; advancing"
            );
            state.timer = None;
            state.current = None;
            state.processing = false;
        }
        self.advance();
    }

    fn emit_status(&self) {
        let (queue_length, current_id) = {
            let state = self.lock();
            (
                state.pending.len(),
                state.current.as_ref().map(|c| c.id.clone()),
            )
        };
        self.core.hub.broadcast(
            NS_DASHBOARD,
            "status:update",
            json!({ "queueLength": queue_length, "currentAlertId": current_id }),
        );
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.core.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::HubSocket;
    use serde_json::Value;

    fn spec(duration_ms: i64) -> AlertSpec {
        AlertSpec {
            alert_id: "a1".into(),
            message_template: "{username} just followed!".into(),
            duration_ms,
            animation_in: "fade-in".into(),
            animation_out: "fade-out".into(),
            sound_path: None,
            sound_volume: 0.8,
            image_path: None,
            font_family: "Inter".into(),
            font_size: 32,
            text_color: "#ffffff".into(),
            background_color: None,
            custom_css: None,
            tts_enabled: false,
            tts_voice: None,
            tts_rate: 1.0,
            tts_pitch: 1.0,
            tts_volume: 1.0,
            variation_id: None,
            variation_name: None,
        }
    }

    fn submission(id: &str, duration_ms: i64) -> AlertSubmission {
        AlertSubmission {
            instance_id: Some(id.into()),
            event_type: Some(EventType::Follow),
            username: Some("alice".into()),
            display_name: None,
            amount: None,
            message: None,
            config: spec(duration_ms),
        }
    }

    fn setup() -> (Arc<Hub>, AlertQueue) {
        let hub = Arc::new(Hub::new());
        let queue = AlertQueue::new(hub.clone());
        (hub, queue)
    }

    fn drain_triggers(socket: &mut HubSocket) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(raw) = socket.rx.try_recv() {
            let v: Value = serde_json::from_str(&raw).unwrap();
            if v["event"] == "alert:trigger" {
                frames.push(v["data"].clone());
            }
        }
        frames
    }

    /// Let spawned fallback tasks observe the advanced clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn trigger_payload_reaches_overlay_and_ack_advances() {
        let (hub, queue) = setup();
        let mut overlay = hub.connect(NS_ALERTS).unwrap();
        overlay.rx.try_recv().unwrap(); // welcome

        let id = queue.enqueue(submission("i1", 5000)).unwrap();
        assert_eq!(id, "i1");

        let triggers = drain_triggers(&mut overlay);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0]["type"], "follow");
        assert_eq!(triggers[0]["username"], "alice");
        assert_eq!(triggers[0]["displayName"], "alice");
        assert_eq!(triggers[0]["alertConfigId"], "a1");
        assert_eq!(triggers[0]["config"]["duration_ms"], 5000);
        // Caller gave no message, so the type default is filled in.
        assert_eq!(triggers[0]["message"], "{username} just followed!");

        queue.complete(Some("i1"));
        assert_eq!(queue.length(), 0);
        assert!(queue.current().is_none());
    }

    #[tokio::test]
    async fn at_most_one_instance_in_flight() {
        let (hub, queue) = setup();
        let mut overlay = hub.connect(NS_ALERTS).unwrap();
        overlay.rx.try_recv().unwrap();

        queue.enqueue(submission("i1", 5000)).unwrap();
        queue.enqueue(submission("i2", 5000)).unwrap();
        queue.enqueue(submission("i3", 5000)).unwrap();

        assert_eq!(queue.current().unwrap().id, "i1");
        assert_eq!(queue.length(), 2);
        // Only the in-flight instance has been emitted.
        assert_eq!(drain_triggers(&mut overlay).len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_enqueues_nothing() {
        let (_hub, queue) = setup();

        let missing_type = AlertSubmission {
            event_type: None,
            ..submission("i1", 5000)
        };
        assert!(queue.enqueue(missing_type).is_none());

        let missing_username = AlertSubmission {
            username: None,
            ..submission("i2", 5000)
        };
        assert!(queue.enqueue(missing_username).is_none());

        let blank_username = AlertSubmission {
            username: Some("   ".into()),
            ..submission("i3", 5000)
        };
        assert!(queue.enqueue(blank_username).is_none());

        assert_eq!(queue.length(), 0);
        assert!(queue.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fifo_order_with_fallback_when_nobody_listens() {
        let (_hub, queue) = setup();

        queue.enqueue(submission("i1", 1000)).unwrap();
        queue.enqueue(submission("i2", 1000)).unwrap();
        queue.enqueue(submission("i3", 1000)).unwrap();

        assert_eq!(queue.current().unwrap().id, "i1");

        settle().await;
        tokio::time::advance(Duration::from_millis(2001)).await;
        settle().await;
        assert_eq!(queue.current().unwrap().id, "i2");

        tokio::time::advance(Duration::from_millis(2001)).await;
        settle().await;
        assert_eq!(queue.current().unwrap().id, "i3");

        tokio::time::advance(Duration::from_millis(2001)).await;
        settle().await;
        assert!(queue.current().is_none());
        assert_eq!(queue.length(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_order_equals_enqueue_order() {
        let (hub, queue) = setup();
        let mut overlay = hub.connect(NS_ALERTS).unwrap();
        overlay.rx.try_recv().unwrap();

        queue.enqueue(submission("i1", 1000)).unwrap();
        queue.enqueue(submission("i2", 1000)).unwrap();
        queue.enqueue(submission("i3", 1000)).unwrap();

        // Ack the first, let the second time out, ack the third.
        queue.complete(Some("i1"));
        settle().await;
        tokio::time::advance(Duration::from_millis(2001)).await;
        settle().await;
        queue.complete(Some("i3"));

        let order: Vec<String> = drain_triggers(&mut overlay)
            .iter()
            .map(|d| d["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(order, vec!["i1", "i2", "i3"]);
        assert!(queue.current().is_none());
    }

    #[tokio::test]
    async fn stale_ack_is_a_no_op() {
        let (_hub, queue) = setup();
        queue.enqueue(submission("i1", 5000)).unwrap();
        queue.enqueue(submission("i2", 5000)).unwrap();

        queue.complete(Some("bogus"));
        assert_eq!(queue.current().unwrap().id, "i1");
        assert_eq!(queue.length(), 1);

        // Ack without an id counts for the in-flight instance.
        queue.complete(None);
        assert_eq!(queue.current().unwrap().id, "i2");

        // Ack with nothing in flight is ignored.
        queue.complete(Some("i2"));
        assert!(queue.current().is_none());
        queue.complete(Some("i2"));
        assert!(queue.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ack_then_late_timer_advances_only_once() {
        let (hub, queue) = setup();
        let mut overlay = hub.connect(NS_ALERTS).unwrap();
        overlay.rx.try_recv().unwrap();

        queue.enqueue(submission("i1", 1000)).unwrap();
        queue.enqueue(submission("i2", 60000)).unwrap();
        queue.complete(Some("i1"));
        assert_eq!(queue.current().unwrap().id, "i2");

        // i1's fallback window passes; its timer must not complete i2.
        tokio::time::advance(Duration::from_millis(2001)).await;
        settle().await;
        assert_eq!(queue.current().unwrap().id, "i2");
        assert_eq!(drain_triggers(&mut overlay).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_preserves_current() {
        let (hub, queue) = setup();
        let mut overlay = hub.connect(NS_ALERTS).unwrap();
        overlay.rx.try_recv().unwrap();

        queue.enqueue(submission("i1", 1000)).unwrap();
        queue.enqueue(submission("i2", 1000)).unwrap();
        queue.enqueue(submission("i3", 1000)).unwrap();
        drain_triggers(&mut overlay);

        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.current().unwrap().id, "i1");
        assert_eq!(queue.length(), 0);

        queue.complete(Some("i1"));
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        // i2 and i3 were never emitted.
        assert!(drain_triggers(&mut overlay).is_empty());
        assert!(queue.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn queue_stays_usable_after_idle_timer_expiry() {
        let (_hub, queue) = setup();
        queue.enqueue(submission("i1", 1000)).unwrap();
        queue.complete(Some("i1"));

        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert!(queue.current().is_none());

        queue.enqueue(submission("i2", 1000)).unwrap();
        assert_eq!(queue.current().unwrap().id, "i2");
    }
}
