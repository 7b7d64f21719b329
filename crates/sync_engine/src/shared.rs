//! Thread-safe handle around one estimator.
//!
//! The estimator itself is a plain value type. When the writer (the context
//! delivering time pairs) and the readers (code stamping outgoing events) run
//! on different threads, they share a `SharedApHubSync` so every operation is
//! serialized behind one lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{SampleOutcome, SyncConfig, SyncPhase, SyncSnapshot, INVALID_DELTA};
use tracing::warn;

use crate::ApHubSync;

/// Cloneable, lock-protected estimator handle
#[derive(Debug, Clone, Default)]
pub struct SharedApHubSync {
    inner: Arc<Mutex<ApHubSync>>,
}

impl SharedApHubSync {
    pub fn new(config: SyncConfig) -> Self {
        Self::from_estimator(ApHubSync::new(config))
    }

    pub fn from_estimator(estimator: ApHubSync) -> Self {
        Self {
            inner: Arc::new(Mutex::new(estimator)),
        }
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn add_sample(&self, ap_time: u64, hub_time: u64) -> SampleOutcome {
        self.lock().add_sample(ap_time, hub_time)
    }

    /// Current offset estimate.
    ///
    /// A writer that panicked mid-update leaves state that cannot be trusted:
    /// that read yields [`INVALID_DELTA`] and the estimator is reset.
    pub fn get_delta(&self, hub_time: u64) -> i64 {
        match self.inner.lock() {
            Ok(guard) => guard.get_delta(hub_time),
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                warn!(phase = %guard.phase(), "ApHub sync: invalid sync state, lock poisoned");
                guard.reset();
                self.inner.clear_poison();
                INVALID_DELTA
            }
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.lock().phase()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.lock().snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, ApHubSync> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
