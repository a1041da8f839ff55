//! WebSocket endpoints bridging sockets into the Hub.
//!
//! One upgrade handler per namespace; all of them share the same
//! session loop. Outbound frames come from the Hub registration,
//! inbound frames go through the dispatch table. The server pings
//! every 25 s and drops sessions silent for 60 s.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use crate::app::SharedState;
use crate::hub::{dispatch, HubSocket, NS_ALERTS, NS_CHAT, NS_DASHBOARD, NS_WIDGETS};

const PING_INTERVAL: Duration = Duration::from_secs(25);
const PING_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn ws_alerts(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, NS_ALERTS))
}

pub async fn ws_chat(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, NS_CHAT))
}

pub async fn ws_widgets(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, NS_WIDGETS))
}

pub async fn ws_dashboard(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, NS_DASHBOARD))
}

async fn handle_socket(socket: WebSocket, state: SharedState, ns: &'static str) {
    let Some(HubSocket { socket_id, mut rx }) = state.hub().connect(ns) else {
        return;
    };

    let (mut sender, mut receiver) = socket.split();

    // Forward hub frames to this client; interleave keepalive pings.
    let mut send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ping.tick().await; // the first tick completes immediately
        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // Hub dropped the registration (shutdown).
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Receive and dispatch client frames. Any inbound frame (pongs
    // included) counts as liveness.
    let recv_state = state.clone();
    let sid = socket_id.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            match tokio::time::timeout(PING_TIMEOUT, receiver.next()).await {
                Err(_) => {
                    tracing::warn!(
                        namespace = ns,
                        socket_id = %sid,
                        "No pong within timeout, dropping session"
                    );
                    break;
                }
                Ok(Some(Ok(Message::Text(text)))) => {
                    dispatch::handle_client_message(&recv_state, ns, &sid, &text);
                }
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => break,
                Ok(Some(Ok(_))) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    state.hub().disconnect(ns, &socket_id, "socket closed");
}
