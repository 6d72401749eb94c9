//! Pluggable authentication providers.
//!
//! Connection-oriented transports (WebSocket handshakes, room joins) hand a
//! flat credential map to a named provider and get back an [`Identity`] or
//! nothing. They never see the scheme behind the name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::models::{Credential, Identity};
use super::service::AuthService;

/// Flat credential map supplied by a transport.
pub type CredentialMap = HashMap<String, String>;

/// One authentication scheme.
///
/// Every call is independent: providers must not carry state between calls,
/// even for the same connection.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Registry name of the scheme.
    fn name(&self) -> &'static str;

    async fn authenticate(&self, credentials: &CredentialMap) -> Option<Identity>;
}

/// Ed25519 request signatures, backed by [`AuthService`].
///
/// Map keys: `publicKey`, `timestamp`, `nonce`, `signature`, optional `message`.
pub struct SignatureProvider {
    service: Arc<AuthService>,
}

impl SignatureProvider {
    pub const NAME: &'static str = "signature";

    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }

    fn credential(credentials: &CredentialMap) -> Option<Credential> {
        Some(Credential {
            public_key: credentials.get("publicKey")?.clone(),
            timestamp: credentials.get("timestamp")?.parse().ok()?,
            nonce: credentials.get("nonce")?.clone(),
            signature: credentials.get("signature")?.clone(),
            message: credentials.get("message").cloned().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl AuthProvider for SignatureProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn authenticate(&self, credentials: &CredentialMap) -> Option<Identity> {
        let Some(credential) = Self::credential(credentials) else {
            debug!("[SignatureProvider] Incomplete credential map");
            return None;
        };
        self.service.validate(&credential).identity
    }
}

/// Claims carried by bearer tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (holder's public key)
    pub sub: String,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at
    pub iat: usize,
    #[serde(default)]
    pub admin: bool,
}

/// HS256 bearer tokens. Map key: `token`.
pub struct TokenProvider {
    secret: String,
}

impl TokenProvider {
    pub const NAME: &'static str = "token";

    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for `subject` valid for `ttl`.
    pub fn issue(&self, subject: &str, admin: bool, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(ttl)
            .context("Token expiry out of range")?
            .timestamp();

        let claims = Claims {
            sub: subject.to_string(),
            exp: expiration as usize,
            iat: now.timestamp() as usize,
            admin,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate token")
    }

    /// Verify a token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

#[async_trait]
impl AuthProvider for TokenProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn authenticate(&self, credentials: &CredentialMap) -> Option<Identity> {
        let token = credentials.get("token")?;
        match self.verify_token(token) {
            Ok(claims) => Some(Identity::new(claims.sub, claims.admin)),
            Err(e) => {
                debug!("[TokenProvider] Rejected token: {}", e);
                None
            }
        }
    }
}

/// Providers by name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn AuthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn AuthProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AuthProvider>> {
        self.providers.get(name)
    }

    /// Names of registered providers, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Authenticate through the named provider. Unknown names yield `None`.
    pub async fn authenticate(&self, name: &str, credentials: &CredentialMap) -> Option<Identity> {
        match self.get(name) {
            Some(provider) => provider.authenticate(credentials).await,
            None => {
                debug!("Unknown auth provider: {}", name);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::canonical::sign_credential;
    use crate::auth::signature::{generate_signing_key, public_key_hex};
    use crate::config::AuthConfig;

    fn credential_map(cred: &Credential) -> CredentialMap {
        HashMap::from([
            ("publicKey".to_string(), cred.public_key.clone()),
            ("timestamp".to_string(), cred.timestamp.to_string()),
            ("nonce".to_string(), cred.nonce.clone()),
            ("signature".to_string(), cred.signature.clone()),
            ("message".to_string(), cred.message.clone()),
        ])
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    #[tokio::test]
    async fn test_signature_provider() {
        let service = Arc::new(AuthService::new(&AuthConfig::default()).unwrap());
        let provider = SignatureProvider::new(service);
        let key = generate_signing_key();
        let cred = sign_credential(&key, now_ms(), "n1", "join:room-1");
        let map = credential_map(&cred);

        let identity = provider.authenticate(&map).await.unwrap();
        assert_eq!(identity.public_key, public_key_hex(&key));

        // Same map again is a replay
        assert!(provider.authenticate(&map).await.is_none());
    }

    #[tokio::test]
    async fn test_signature_provider_incomplete_map() {
        let service = Arc::new(AuthService::new(&AuthConfig::default()).unwrap());
        let provider = SignatureProvider::new(service);
        let mut map = credential_map(&sign_credential(&generate_signing_key(), now_ms(), "n", ""));
        map.remove("nonce");
        assert!(provider.authenticate(&map).await.is_none());
    }

    #[tokio::test]
    async fn test_token_provider() {
        let provider = TokenProvider::new("secret");
        let token = provider.issue("abcd", true, Duration::hours(1)).unwrap();
        let map = HashMap::from([("token".to_string(), token)]);

        let identity = provider.authenticate(&map).await.unwrap();
        assert_eq!(identity.public_key, "abcd");
        assert!(identity.is_admin);

        let other = TokenProvider::new("other-secret");
        assert!(other.authenticate(&map).await.is_none());
    }

    #[tokio::test]
    async fn test_token_provider_expired() {
        let provider = TokenProvider::new("secret");
        let token = provider.issue("abcd", false, Duration::hours(-2)).unwrap();
        let map = HashMap::from([("token".to_string(), token)]);
        assert!(provider.authenticate(&map).await.is_none());
    }

    #[tokio::test]
    async fn test_registry() {
        let service = Arc::new(AuthService::new(&AuthConfig::default()).unwrap());
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(SignatureProvider::new(service)));
        registry.register(Arc::new(TokenProvider::new("secret")));
        assert_eq!(registry.names(), vec!["signature", "token"]);

        let cred = sign_credential(&generate_signing_key(), now_ms(), "n1", "");
        assert!(
            registry
                .authenticate("signature", &credential_map(&cred))
                .await
                .is_some()
        );
        assert!(
            registry
                .authenticate("session", &credential_map(&cred))
                .await
                .is_none()
        );
    }
}
