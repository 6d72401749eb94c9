//! Route handlers. Identities arrive through request extensions set by
//! `auth_layer`.

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;

use super::state::AppState;
use super::types::{ApiResponse, EchoResponse, HealthResponse, WhoAmIResponse, error_codes};
use crate::auth::{AuthMetricsSnapshot, Identity};

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        timestamp_ms: Utc::now().timestamp_millis(),
        nonces_tracked: state.auth.nonce_count(),
        git_hash: env!("GIT_HASH"),
    }))
}

/// GET /api/v1/public/whoami (optional auth)
pub async fn whoami(
    Extension(identity): Extension<Option<Identity>>,
) -> Json<ApiResponse<WhoAmIResponse>> {
    Json(ApiResponse::success(WhoAmIResponse {
        authenticated: identity.is_some(),
        identity,
    }))
}

/// GET /api/v1/private/me
pub async fn me(Extension(identity): Extension<Identity>) -> Json<ApiResponse<Identity>> {
    Json(ApiResponse::success(identity))
}

/// POST /api/v1/private/echo (requires `write`)
pub async fn echo(
    Extension(identity): Extension<Identity>,
    body: String,
) -> Json<ApiResponse<EchoResponse>> {
    Json(ApiResponse::success(EchoResponse {
        public_key: identity.public_key,
        body,
    }))
}

/// GET /api/v1/admin/metrics
pub async fn auth_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AuthMetricsSnapshot>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.auth.metrics() {
        Some(snapshot) => Ok(Json(ApiResponse::success(snapshot))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(
                error_codes::NOT_FOUND,
                "Metrics are disabled",
            )),
        )),
    }
}
