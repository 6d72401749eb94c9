//! Time source for drift checks and nonce retention.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("system clock is before the Unix epoch")]
    BeforeEpoch(#[from] std::time::SystemTimeError),
    #[error("system clock out of range")]
    OutOfRange,
}

/// Milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Result<i64, ClockError>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Result<i64, ClockError> {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        i64::try_from(millis).map_err(|_| ClockError::OutOfRange)
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Result<i64, ClockError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}
