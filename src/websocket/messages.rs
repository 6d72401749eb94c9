use serde::{Deserialize, Serialize};

use crate::auth::Identity;

/// Server → client frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Connected { identity: Identity },
    Pong,
    Error { message: String },
}

/// Client → server frames.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}
