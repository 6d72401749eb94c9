//! Nonce store for replay attack prevention.
//!
//! Records every accepted `publicKey:nonce` pair with the server time of first
//! acceptance. Records are kept at least `2 × max_time_drift` so that any
//! credential still inside the drift window can never be replayed; older
//! records are dropped by [`NonceStore::sweep`].

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Thread-safe store of consumed nonces.
///
/// Backed by a sharded `DashMap`; [`try_commit`](Self::try_commit) uses the
/// entry API so check-and-insert is atomic per key.
pub struct NonceStore {
    /// Map from `publicKey:nonce` to first acceptance time (ms)
    store: DashMap<String, i64>,
}

impl NonceStore {
    /// Create a new empty NonceStore.
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Composite record key.
    pub fn record_key(public_key: &str, nonce: &str) -> String {
        format!("{}:{}", public_key, nonce)
    }

    /// Whether the pair has already been consumed.
    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    /// Insert the record if absent.
    ///
    /// Returns `true` if this call consumed the nonce, `false` if another
    /// request already holds it (replay).
    pub fn try_commit(&self, key: &str, now_ms: i64) -> bool {
        match self.store.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now_ms);
                true
            }
        }
    }

    /// First acceptance time of a record.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.store.get(key).map(|entry| *entry)
    }

    /// Remove every record older than `max_age_ms` relative to `now_ms`.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, now_ms: i64, max_age_ms: i64) -> usize {
        let before = self.store.len();
        self.store
            .retain(|_, first_seen| now_ms.saturating_sub(*first_seen) <= max_age_ms);
        before.saturating_sub(self.store.len())
    }

    /// Get the number of tracked nonces.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new()
    }
}
