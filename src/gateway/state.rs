use std::sync::Arc;

use crate::auth::{AuthService, ProviderRegistry};

/// Gateway shared state.
#[derive(Clone)]
pub struct AppState {
    /// Signature validation (owns the nonce store)
    pub auth: Arc<AuthService>,
    /// Named providers for WebSocket handshakes
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, providers: Arc<ProviderRegistry>) -> Self {
        Self { auth, providers }
    }
}
