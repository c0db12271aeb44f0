//! Axum server setup and router construction.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::PanelHandle;
use crate::api::{self, AppState};
use crate::error::ServerError;
use crate::ws::{self, WsState};

/// Build the full axum router.
///
/// The router serves:
/// - WebSocket at `/ws`
/// - REST API at `/api/*`
/// - Optional static files for a frontend build
pub fn build_router(handle: PanelHandle, static_dir: Option<PathBuf>) -> Router {
    let app_state = AppState {
        handle: handle.clone(),
    };
    let ws_state = WsState { handle };

    // Frontend dev servers run on another port.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .with_state(ws_state);

    let api_routes = Router::new()
        .route("/api/state", get(api::get_state))
        .route("/api/parameter", post(api::post_parameter))
        .route("/api/refresh", post(api::post_refresh))
        .route("/api/submit", post(api::post_submit))
        .route("/api/focus", post(api::post_focus))
        .route("/api/scroll", post(api::post_scroll))
        .with_state(app_state);

    let mut router = Router::new().merge(ws_routes).merge(api_routes).layer(cors);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
}

/// Bind `bind_addr`, serve `router` on a background task and return the
/// bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> Result<SocketAddr, ServerError> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind_addr,
            source,
        })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
    info!(%addr, "Prompt panel server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Server stopped: {e}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bound_port_is_reported() {
        let addr = start_server(Router::new(), ([127, 0, 0, 1], 0).into())
            .await
            .unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn taken_port_is_a_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let err = start_server(Router::new(), addr).await.unwrap_err();
        assert!(matches!(&err, ServerError::Bind { addr: a, .. } if *a == addr));
        assert!(err.to_string().starts_with(&format!("failed to bind {addr}")));
    }
}
