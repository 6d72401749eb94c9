//! Authentication counters.
//!
//! Lock-free counters updated on every `validate()` call, and on every
//! policy-level rejection, when `enable_metrics` is set.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::AuthErrorCode;

#[derive(Debug, Default)]
pub struct AuthMetrics {
    /// Total validate() calls
    pub attempts: AtomicU64,
    /// Successful validations
    pub successes: AtomicU64,
    /// Rejections indexed by `AuthErrorCode::index()`
    failures: [AtomicU64; AuthErrorCode::ALL.len()],
    /// Records evicted by nonce sweeps
    pub nonces_evicted: AtomicU64,
}

impl AuthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, code: AuthErrorCode) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.failures[code.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejection raised outside `validate()` (missing credential,
    /// policy check, unreadable body). Does not count as an attempt.
    pub fn record_rejection(&self, code: AuthErrorCode) {
        self.failures[code.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.nonces_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn failures(&self, code: AuthErrorCode) -> u64 {
        self.failures[code.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> AuthMetricsSnapshot {
        let failures = AuthErrorCode::ALL
            .iter()
            .map(|code| (code.name(), self.failures(*code)))
            .filter(|(_, count)| *count > 0)
            .collect();
        AuthMetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures,
            nonces_evicted: self.nonces_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of auth counters (for reporting)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthMetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: BTreeMap<&'static str, u64>,
    pub nonces_evicted: u64,
}

impl std::fmt::Display for AuthMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Auth Stats: attempts={}, ok={}, failed={}, evicted={}",
            self.attempts,
            self.successes,
            self.failures.values().sum::<u64>(),
            self.nonces_evicted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let metrics = AuthMetrics::new();
        metrics.record_success();
        metrics.record_failure(AuthErrorCode::NonceReused);
        metrics.record_failure(AuthErrorCode::NonceReused);
        metrics.record_evictions(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.attempts, 3);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.failures.get("nonce_reused"), Some(&2));
        assert!(!snap.failures.contains_key("invalid_signature"));
        assert_eq!(snap.nonces_evicted, 3);
        assert!(snap.to_string().contains("failed=2"));
    }

    #[test]
    fn test_rejection_not_an_attempt() {
        let metrics = AuthMetrics::new();
        metrics.record_success();
        metrics.record_rejection(AuthErrorCode::NotAdmin);

        let snap = metrics.snapshot();
        assert_eq!(snap.attempts, 1);
        assert_eq!(snap.failures.get("not_admin"), Some(&1));
    }
}
