//! keysig_auth gateway
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌─────────────┐    ┌──────────┐
//! │ Request  │───▶│ Policy layer │───▶│ AuthService │───▶│ Handler  │
//! │ (axum)   │    │ (auth_layer) │    │ (validate)  │    │ +Identity│
//! └──────────┘    └──────────────┘    └─────────────┘    └──────────┘
//!                                           │
//!                                     ┌─────▼──────┐
//!                                     │ NonceStore │◀── sweeper task
//!                                     └────────────┘
//! ```

use std::sync::Arc;

use anyhow::Result;
use keysig_auth::auth::{AuthService, ProviderRegistry, SignatureProvider, TokenProvider};
use keysig_auth::config::AppConfig;
use keysig_auth::gateway::{self, state::AppState};
use keysig_auth::logging::init_logging;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config)?;
    tracing::info!(
        env = %env,
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        "Starting keysig_auth gateway"
    );

    let auth = Arc::new(AuthService::new(&config.auth)?);
    let _sweeper = auth.spawn_nonce_sweeper();

    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(SignatureProvider::new(auth.clone())));
    match &config.auth.token_secret {
        Some(secret) => providers.register(Arc::new(TokenProvider::new(secret.clone()))),
        None => tracing::warn!("Token provider disabled (auth.token_secret not set)"),
    }
    tracing::info!(providers = ?providers.names(), "Auth providers registered");

    let state = Arc::new(AppState::new(auth, Arc::new(providers)));
    gateway::run_server(&config.gateway.host, config.gateway.port, state).await
}
