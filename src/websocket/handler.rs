//! WebSocket handler for client connections
//!
//! Handles the authenticated upgrade and the connection lifecycle.

use axum::extract::ws::{Message, WebSocket};
use axum::{
    Json,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

use super::messages::{ClientMessage, WsMessage};
use crate::auth::{
    CredentialMap, Identity, ProviderRegistry, SignatureProvider, request_message,
};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, error_codes};

/// Route the handshake is bound to.
pub const WS_PATH: &str = "/ws";

/// Decide a handshake from its query parameters.
///
/// `provider` selects the backend (default `signature`). For the signature
/// provider the signed message is always `GET:/ws`, so a handshake signature
/// cannot be lifted from another route.
pub async fn authenticate_handshake(
    providers: &ProviderRegistry,
    mut params: CredentialMap,
) -> Option<Identity> {
    let provider = params
        .remove("provider")
        .unwrap_or_else(|| SignatureProvider::NAME.to_string());
    if provider == SignatureProvider::NAME {
        params.insert("message".to_string(), request_message("GET", WS_PATH, None));
    }
    providers.authenticate(&provider, &params).await
}

/// WebSocket upgrade handler
///
/// Endpoint: `GET /ws?provider=signature&publicKey=..&timestamp=..&nonce=..&signature=..`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<CredentialMap>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match authenticate_handshake(&state.providers, params).await {
        Some(identity) => ws.on_upgrade(move |socket| handle_socket(socket, identity)),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::HANDSHAKE_REJECTED,
                "Handshake authentication failed",
            )),
        )
            .into_response(),
    }
}

/// Handle WebSocket connection lifecycle
async fn handle_socket(mut socket: WebSocket, identity: Identity) {
    let key_prefix: String = identity.public_key.chars().take(8).collect();
    info!(key = %key_prefix, "WebSocket connected");

    let welcome = WsMessage::Connected { identity };
    if send(&mut socket, &welcome).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let reply = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Ping) => WsMessage::Pong,
                    Err(_) => WsMessage::Error {
                        message: "unsupported message".to_string(),
                    },
                };
                if send(&mut socket, &reply).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!(key = %key_prefix, "WebSocket closed");
}

async fn send(socket: &mut WebSocket, msg: &WsMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(_) => Ok(()),
    }
}
