pub mod bridge;
pub mod gate;
pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use webterm_core::config::AppConfig;

pub use state::AppState;

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let cors = state.config.server.cors;

    // The terminal UI is served from a separate path tree; anything that
    // is not an API route falls through to it.
    let mut app = Router::new()
        .merge(routes::health_routes())
        .merge(routes::terminal_routes())
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .with_state(state);

    // Middleware stack.
    app = app.layer(TraceLayer::new_for_http());

    if cors {
        // The browser client may be served from elsewhere during dev.
        app = app.layer(CorsLayer::permissive());
    }

    app
}

/// Start the HTTP server.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    if config.server.pass_key.is_none() {
        tracing::warn!("No pass_key configured — every websocket upgrade will be rejected");
    }

    let state = AppState::new(config.clone())?;
    tracing::info!(shell = %state.shell.id, "resolved session shell");

    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Build a test router with the given pass key. None if no shell is
    /// available on this host.
    fn test_router(pass_key: Option<&str>) -> Option<Router> {
        webterm_pty::default_shell()?;

        let mut config = AppConfig::default();
        config.server.pass_key = pass_key.map(String::from);

        let state = AppState::new(config).expect("Failed to create test app state");
        let router = build_router(state)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4321))));
        Some(router)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = match test_router(Some("secret")) {
            Some(a) => a,
            None => return,
        };

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    /// A plain GET on the upgrade endpoint is rejected by the websocket
    /// extractor before the handler runs. The credential paths (401 and a
    /// successful 101) are exercised against a live server in
    /// `tests/ws_session.rs`, since an upgrade needs a real connection.
    #[tokio::test]
    async fn test_ws_requires_websocket_upgrade() {
        let app = match test_router(Some("secret")) {
            Some(a) => a,
            None => return,
        };

        let req = Request::builder()
            .uri("/ws?passkey=secret")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_static_ui_fallback() {
        let shell = webterm_pty::default_shell();
        if shell.is_none() {
            return;
        }

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<title>webterm</title>").unwrap();

        let mut config = AppConfig::default();
        config.server.static_dir = dir.path().to_path_buf();
        let state = AppState::new(config).unwrap();
        let app = build_router(state)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4321))));

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
