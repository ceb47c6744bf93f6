//! Per-key lock registry
//!
//! Hands out one async mutex per normalized key, created lazily on first
//! access and kept for the registry's lifetime. A catalog owns two
//! registries: one for book keys and one for user keys.
//!
//! - Get-or-create is atomic: concurrent callers for the same key always
//!   receive the same lock instance
//! - Acquisition waits indefinitely by default, or fails with
//!   [`Error::LockTimeout`] when a timeout is configured
//! - Guards are owned, so they can be held across `.await` points and are
//!   released on drop along every exit path

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{Error, KeyKind, Result};

/// A held per-key lock, released when dropped
pub type KeyGuard = OwnedMutexGuard<()>;

/// Lazily populated map of key -> lock
#[derive(Debug)]
pub struct LockRegistry {
    kind: KeyKind,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new(kind: KeyKind) -> Self {
        Self {
            kind,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Which key namespace this registry guards
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Return the lock for `key`, creating an unlocked one if absent.
    ///
    /// `key` must already be normalized.
    pub fn get_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        // Insert-only map: still consistent after a poisoning panic.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Acquire the lock for `key`.
    ///
    /// With `timeout` of `None` this waits indefinitely.
    pub async fn acquire(&self, key: &str, timeout: Option<Duration>) -> Result<KeyGuard> {
        let lock = self.get_lock(key);
        match timeout {
            None => Ok(lock.lock_owned().await),
            Some(limit) => tokio::time::timeout(limit, lock.lock_owned())
                .await
                .map_err(|_| {
                    tracing::warn!(kind = %self.kind, key, ?limit, "lock acquisition timed out");
                    Error::LockTimeout {
                        kind: self.kind,
                        key: key.to_string(),
                    }
                }),
        }
    }

    /// Number of distinct keys that have been locked so far
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
