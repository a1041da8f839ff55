use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::{api, websocket};
use crate::app::SharedState;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // --- Core ---
        .route("/api/health", get(api::status::health))
        .route("/api/ws/status", get(api::status::ws_status))
        // --- Test alerts ---
        .route("/api/test-alert", post(api::test_alert::submit))
        .route("/api/test-alert/clear", post(api::test_alert::clear))
        .route("/api/test-alert/status", get(api::test_alert::status))
        // --- Event log ---
        .route("/api/events", get(api::events::list))
        .route("/api/events/range", get(api::events::range))
        .route("/api/events/prune", post(api::events::prune))
        // --- Alerts ---
        .route(
            "/api/alerts",
            get(api::alerts::list).post(api::alerts::create),
        )
        .route(
            "/api/alerts/{id}",
            get(api::alerts::get_one)
                .put(api::alerts::update)
                .delete(api::alerts::delete),
        )
        // --- Variations ---
        .route(
            "/api/alerts/{id}/variations",
            get(api::variations::list_for_alert).post(api::variations::create),
        )
        .route(
            "/api/variations/{id}",
            axum::routing::put(api::variations::update).delete(api::variations::delete),
        )
        // --- Templates ---
        .route(
            "/api/templates",
            get(api::templates::list).post(api::templates::create),
        )
        .route(
            "/api/templates/{id}",
            get(api::templates::get_one)
                .put(api::templates::update)
                .delete(api::templates::delete),
        )
        // --- Settings ---
        .route("/api/settings", get(api::settings::get_all))
        .route(
            "/api/settings/{key}",
            get(api::settings::get_one).put(api::settings::set_one),
        )
        // --- WebSocket namespaces ---
        .route("/alerts", get(websocket::ws_alerts))
        .route("/chat", get(websocket::ws_chat))
        .route("/widgets", get(websocket::ws_widgets))
        .route("/dashboard", get(websocket::ws_dashboard))
        // --- Middleware ---
        .layer(cors_layer())
        .with_state(state)
}

/// Localhost-only allow-list. Credentials are allowed, so origins are
/// echoed back individually rather than wildcarded.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.to_str().map(origin_allowed).unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn origin_allowed(origin: &str) -> bool {
    // Host-shell webview origins.
    if origin == "tauri://localhost" || origin == "http://tauri.localhost" {
        return true;
    }
    let Some(rest) = origin.strip_prefix("http://") else {
        return false;
    };
    let host = rest.split(':').next().unwrap_or(rest);
    matches!(host, "127.0.0.1" | "localhost")
}

#[cfg(test)]
mod tests {
    use super::origin_allowed;

    #[test]
    fn loopback_origins_allowed_on_any_port() {
        assert!(origin_allowed("http://127.0.0.1:3000"));
        assert!(origin_allowed("http://127.0.0.1:39283"));
        assert!(origin_allowed("http://localhost:5173"));
        assert!(origin_allowed("http://localhost"));
    }

    #[test]
    fn host_shell_origins_allowed() {
        assert!(origin_allowed("tauri://localhost"));
        assert!(origin_allowed("http://tauri.localhost"));
    }

    #[test]
    fn other_origins_rejected() {
        assert!(!origin_allowed("http://example.com"));
        assert!(!origin_allowed("https://localhost:3000"));
        assert!(!origin_allowed("http://localhost.evil.com"));
        assert!(!origin_allowed("http://192.168.1.10:3000"));
        assert!(!origin_allowed("file://"));
    }
}
