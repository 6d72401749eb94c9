pub mod handlers;
pub mod state;
pub mod types;

use anyhow::{Context, Result};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::{AuthPolicy, Permission, PolicyState, auth_layer};
use crate::websocket::{handler::WS_PATH, ws_handler};
use state::AppState;

/// Build the gateway router.
///
/// | Route | Policy |
/// |---|---|
/// | `GET /health` | none |
/// | `GET /ws` | handshake provider |
/// | `GET /api/v1/public/whoami` | Optional |
/// | `GET /api/v1/private/me` | Required |
/// | `POST /api/v1/private/echo` | Permissions [write] |
/// | `GET /api/v1/admin/metrics` | AdminOnly |
pub fn router(state: Arc<AppState>) -> Router {
    let policy = |p: AuthPolicy| PolicyState::new(state.auth.clone(), p);

    let public_routes = Router::new()
        .route("/whoami", get(handlers::whoami))
        .route_layer(from_fn_with_state(policy(AuthPolicy::Optional), auth_layer));

    let write_routes = Router::new()
        .route("/echo", post(handlers::echo))
        .route_layer(from_fn_with_state(
            policy(AuthPolicy::Permissions(vec![Permission::Write])),
            auth_layer,
        ));

    let private_routes = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(from_fn_with_state(policy(AuthPolicy::Required), auth_layer))
        .merge(write_routes);

    let admin_routes = Router::new()
        .route("/metrics", get(handlers::auth_metrics))
        .route_layer(from_fn_with_state(policy(AuthPolicy::AdminOnly), auth_layer));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(WS_PATH, get(ws_handler))
        .nest("/api/v1/public", public_routes)
        .nest("/api/v1/private", private_routes)
        .nest("/api/v1/admin", admin_routes)
        .with_state(state)
}

/// Serve the gateway until the listener fails.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Gateway listening on http://{}", addr);
    axum::serve(listener, app).await.context("Gateway server error")
}
