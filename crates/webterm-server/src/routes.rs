use crate::state::AppState;
use crate::{bridge, gate};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Terminal ────────────────────────────────────────────────────────────

pub fn terminal_routes() -> Router<AppState> {
    Router::new().route("/ws", get(terminal_ws))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    passkey: Option<String>,
}

/// Upgrade endpoint for terminal sessions.
///
/// The gate runs before `on_upgrade`: an unauthorized request is rejected
/// with 401 and never allocates a shell or a PTY.
async fn terminal_ws(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    if !gate::authorize(
        query.passkey.as_deref(),
        state.config.server.pass_key.as_deref(),
    ) {
        tracing::warn!(%peer, "unauthorized websocket connection attempt");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let shell = state.shell.clone();
    ws.on_upgrade(move |socket| bridge::run(socket, shell, peer))
}
