//! Ed25519 request authentication.
//!
//! ## Components
//! - `models`: keys, credentials, identities, admin key set
//! - `canonical`: signed message and digest construction
//! - `signature`: Ed25519 verification
//! - `nonce_store`: replay protection
//! - `clock`: time source (system or manual)
//! - `metrics`: optional auth counters
//! - `service`: the validation state machine
//! - `middleware`: policies and Axum middleware
//! - `provider`: named providers for non-HTTP transports
//! - `error`: authentication error codes (4101-4108)

pub mod canonical;
pub mod clock;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod nonce_store;
pub mod provider;
pub mod service;
pub mod signature;

// Re-export for convenience
pub use canonical::{generate_nonce, request_message, sign_credential, signing_digest};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, AuthErrorCode};
pub use metrics::{AuthMetrics, AuthMetricsSnapshot};
pub use middleware::{
    AuthPolicy, PolicyState, RequestEnvelope, auth_layer, authorize, enforce, extract_credential,
};
pub use models::{AdminKeySet, AuthResult, Credential, Identity, Permission, PublicKey};
pub use nonce_store::NonceStore;
pub use provider::{
    AuthProvider, CredentialMap, ProviderRegistry, SignatureProvider, TokenProvider,
};
pub use service::AuthService;
pub use signature::verify_ed25519;
