//! Authentication service.
//!
//! Validation flow, short-circuiting on the first failure:
//!
//! 1. Public key structure (64 hex chars → 32 bytes)
//! 2. Timestamp within `max_time_drift_ms` of server time
//! 3. Nonce not yet consumed for this key
//! 4. SHA-256 digest of `publicKey:timestamp:nonce:message`
//! 5. Ed25519 signature over the digest
//!
//! The nonce is committed only after step 5 succeeds, so a failed attempt
//! never burns a nonce.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::canonical::signing_digest;
use super::clock::{Clock, SystemClock};
use super::error::AuthErrorCode;
use super::metrics::{AuthMetrics, AuthMetricsSnapshot};
use super::models::{AdminKeySet, AuthResult, Credential, Identity, PublicKey};
use super::nonce_store::NonceStore;
use super::signature::verify_hex_signature;
use crate::config::AuthConfig;

/// Stateless request authenticator.
///
/// Each instance owns its nonce store, so independent services never share
/// replay state.
pub struct AuthService {
    max_time_drift_ms: i64,
    nonce_retention_ms: i64,
    gc_interval: Duration,
    admins: AdminKeySet,
    nonces: NonceStore,
    clock: Arc<dyn Clock>,
    metrics: Option<AuthMetrics>,
}

impl AuthService {
    /// Build a service on the system clock.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a service on a caller-provided clock.
    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let admins = AdminKeySet::from_keys(&config.admin_keys)
            .context("Invalid auth.admin_keys entry")?;
        if config.max_time_drift_ms <= 0 {
            anyhow::bail!("max_time_drift_ms must be positive");
        }
        info!(
            admin_keys = admins.len(),
            max_time_drift_ms = config.max_time_drift_ms,
            metrics = config.enable_metrics,
            "Auth service initialized"
        );
        Ok(Self {
            max_time_drift_ms: config.max_time_drift_ms,
            nonce_retention_ms: config.nonce_retention_ms(),
            gc_interval: Duration::from_millis(config.nonce_gc_interval_ms.max(1)),
            admins,
            nonces: NonceStore::new(),
            clock,
            metrics: config.enable_metrics.then(AuthMetrics::new),
        })
    }

    /// Validate a credential.
    ///
    /// Never panics on bad input: every expected failure comes back as an
    /// `AuthResult` with its error code.
    pub fn validate(&self, credential: &Credential) -> AuthResult {
        match self.check(credential) {
            Ok(identity) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_success();
                }
                debug!(
                    key = key_prefix(&credential.public_key),
                    admin = identity.is_admin,
                    "Credential accepted"
                );
                AuthResult::ok(identity)
            }
            Err(code) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(code);
                }
                warn!(
                    key = key_prefix(&credential.public_key),
                    error = code.name(),
                    "Credential rejected"
                );
                AuthResult::fail(code)
            }
        }
    }

    fn check(&self, credential: &Credential) -> Result<Identity, AuthErrorCode> {
        // Step 1: key structure
        let key = PublicKey::parse(&credential.public_key).map_err(|e| e.code)?;

        // Step 2: time window
        let now_ms = self.clock.now_ms().map_err(|e| {
            error!("Clock failure during validation: {}", e);
            AuthErrorCode::InternalError
        })?;
        if now_ms.abs_diff(credential.timestamp) > self.max_time_drift_ms as u64 {
            return Err(AuthErrorCode::TimestampExpired);
        }

        // Step 3: replay pre-check
        let record_key = NonceStore::record_key(key.as_hex(), &credential.nonce);
        if self.nonces.contains(&record_key) {
            return Err(AuthErrorCode::NonceReused);
        }

        // Step 4 + 5: digest and signature
        let digest = signing_digest(
            key.as_hex(),
            credential.timestamp,
            &credential.nonce,
            &credential.message,
        );
        if !verify_hex_signature(key.as_bytes(), &digest, &credential.signature) {
            return Err(AuthErrorCode::InvalidSignature);
        }

        // Commit: loses if a concurrent request consumed the same pair first
        if !self.nonces.try_commit(&record_key, now_ms) {
            return Err(AuthErrorCode::NonceReused);
        }

        Ok(Identity::classify(&key, &self.admins))
    }

    /// Count a rejection decided outside [`validate`](Self::validate).
    pub fn record_rejection(&self, code: AuthErrorCode) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(code);
        }
    }

    /// Run one garbage-collection pass over the nonce store.
    ///
    /// Returns the number of evicted records.
    pub fn sweep_expired_nonces(&self) -> usize {
        let now_ms = match self.clock.now_ms() {
            Ok(now) => now,
            Err(e) => {
                error!("Skipping nonce sweep: {}", e);
                return 0;
            }
        };
        let evicted = self.nonces.sweep(now_ms, self.nonce_retention_ms);
        if let Some(metrics) = &self.metrics {
            metrics.record_evictions(evicted);
        }
        if evicted > 0 {
            debug!(evicted, remaining = self.nonces.len(), "Nonce sweep");
        }
        evicted
    }

    /// Spawn the periodic nonce sweep on the current tokio runtime.
    pub fn spawn_nonce_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.gc_interval);
            // The first tick completes immediately
            ticker.tick().await;
            info!(
                interval_ms = service.gc_interval.as_millis() as u64,
                "[NonceSweeper] Started"
            );
            loop {
                ticker.tick().await;
                service.sweep_expired_nonces();
            }
        })
    }

    pub fn max_time_drift_ms(&self) -> i64 {
        self.max_time_drift_ms
    }

    /// Age after which a nonce record is swept (2 × drift).
    pub fn nonce_retention_ms(&self) -> i64 {
        self.nonce_retention_ms
    }

    pub fn admins(&self) -> &AdminKeySet {
        &self.admins
    }

    /// Number of nonce records currently retained.
    pub fn nonce_count(&self) -> usize {
        self.nonces.len()
    }

    /// `None` when metrics are disabled.
    pub fn metrics(&self) -> Option<AuthMetricsSnapshot> {
        self.metrics.as_ref().map(AuthMetrics::snapshot)
    }
}

fn key_prefix(public_key: &str) -> &str {
    public_key.get(..8).unwrap_or("")
}
