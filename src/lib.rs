//! keysig_auth - Stateless Ed25519 request authentication
//!
//! Proves a request comes from the holder of an Ed25519 key without keeping
//! sessions: every request carries a fresh signed credential.
//!
//! # Modules
//!
//! - [`auth`] - Validation service, replay guard, policies, providers
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup
//! - [`gateway`] - Axum router wiring policies to routes
//! - [`websocket`] - Handshake-authenticated WebSocket endpoint

pub mod auth;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod websocket;

// Convenient re-exports at crate root
pub use auth::{
    AuthError, AuthErrorCode, AuthPolicy, AuthResult, AuthService, Credential, Identity,
    Permission,
};
pub use config::{AppConfig, AuthConfig};
