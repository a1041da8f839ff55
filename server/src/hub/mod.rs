//! Multi-namespace WebSocket fan-out.
//!
//! Each namespace owns its client set behind one lock; the connected
//! count is always the set cardinality under that lock. Broadcasts
//! never hold more than one namespace lock at a time, so relays cannot
//! deadlock.

pub mod dispatch;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use forge_db::now_iso;

pub const NS_ALERTS: &str = "/alerts";
pub const NS_CHAT: &str = "/chat";
pub const NS_WIDGETS: &str = "/widgets";
pub const NS_DASHBOARD: &str = "/dashboard";

/// Reconnection policy published to clients in the welcome handshake.
/// The server does not enforce it.
const RECONNECT_POLICY: ReconnectPolicy = ReconnectPolicy {
    initial_ms: 1000,
    max_ms: 30000,
    jitter: 0.5,
};

#[derive(Debug, Clone, Copy, serde::Serialize)]
struct ReconnectPolicy {
    initial_ms: u64,
    max_ms: u64,
    jitter: f64,
}

pub struct Hub {
    namespaces: Vec<Namespace>,
}

struct Namespace {
    path: &'static str,
    label: &'static str,
    clients: Mutex<HashMap<String, mpsc::UnboundedSender<String>>>,
}

/// One connected client's view of its namespace. Dropping the receiver
/// (or calling `Hub::disconnect`) ends the registration.
pub struct HubSocket {
    pub socket_id: String,
    pub rx: mpsc::UnboundedReceiver<String>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        let namespaces = vec![
            Namespace::new(NS_ALERTS, "Alert overlay"),
            Namespace::new(NS_CHAT, "Chat overlay"),
            Namespace::new(NS_WIDGETS, "Widget overlay"),
            Namespace::new(NS_DASHBOARD, "Dashboard"),
        ];
        Self { namespaces }
    }

    pub fn namespace_paths(&self) -> Vec<&'static str> {
        self.namespaces.iter().map(|ns| ns.path).collect()
    }

    /// Register a client. Returns None for an unknown namespace.
    /// The welcome message goes to the connecting socket only.
    pub fn connect(&self, path: &str) -> Option<HubSocket> {
        let ns = self.find(path)?;
        let socket_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        let count = {
            let mut clients = ns.lock();
            clients.insert(socket_id.clone(), tx.clone());
            clients.len()
        };

        let welcome = json!({
            "event": "welcome",
            "data": {
                "namespace": ns.path,
                "socketId": socket_id,
                "clients": count,
                "serverTime": now_iso(),
                "label": ns.label,
                "reconnect": RECONNECT_POLICY,
            },
        });
        let _ = tx.send(welcome.to_string());

        tracing::info!(namespace = ns.path, socket_id = %socket_id, clients = count, "Client connected");
        Some(HubSocket { socket_id, rx })
    }

    pub fn disconnect(&self, path: &str, socket_id: &str, reason: &str) {
        let Some(ns) = self.find(path) else {
            return;
        };
        let count = {
            let mut clients = ns.lock();
            clients.remove(socket_id);
            clients.len()
        };
        tracing::info!(
            namespace = ns.path,
            socket_id,
            clients = count,
            reason,
            "Client disconnected"
        );
    }

    /// Fan an event out to every client of a namespace. Returns the
    /// number of clients the frame was delivered to; dead registrations
    /// are dropped on the way.
    pub fn broadcast(&self, path: &str, event: &str, data: Value) -> usize {
        let Some(ns) = self.find(path) else {
            tracing::warn!(namespace = path, "Broadcast to unknown namespace");
            return 0;
        };
        let frame = json!({ "event": event, "data": data }).to_string();

        let mut clients = ns.lock();
        clients.retain(|_, tx| tx.send(frame.clone()).is_ok());
        clients.len()
    }

    pub fn client_count(&self, path: &str) -> usize {
        self.find(path).map_or(0, |ns| ns.lock().len())
    }

    /// Per-namespace counts plus the total, for the status endpoint.
    pub fn counts(&self) -> (HashMap<&'static str, usize>, usize) {
        let mut counts = HashMap::new();
        let mut total = 0;
        for ns in &self.namespaces {
            let count = ns.lock().len();
            counts.insert(ns.path, count);
            total += count;
        }
        (counts, total)
    }

    /// Drop every client registration. Forward tasks observe the closed
    /// channel and end their sessions.
    pub fn close_all(&self) {
        for ns in &self.namespaces {
            let mut clients = ns.lock();
            let dropped = clients.len();
            clients.clear();
            if dropped > 0 {
                tracing::info!(namespace = ns.path, dropped, "Namespace closed");
            }
        }
    }

    fn find(&self, path: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.path == path)
    }
}

impl Namespace {
    fn new(path: &'static str, label: &'static str) -> Self {
        Self {
            path,
            label,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<String>>> {
        // A poisoned namespace lock only means a panic mid-broadcast;
        // the client map itself is still coherent.
        match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
