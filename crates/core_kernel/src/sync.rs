//! Bounded-wait locking primitives
//!
//! Every mutation in the billing core is serialized on the identity of the
//! entity it touches: a supply, a consultation, an invoice. Waiting for such a
//! lock is always bounded so that no operation can block indefinitely; on
//! contention past the configured wait the caller receives [`LockTimeout`]
//! and decides whether to retry.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Default bounded wait for entity locks
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// A lock could not be acquired within the configured wait
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Timed out after {waited_ms}ms waiting for lock on {resource}")]
pub struct LockTimeout {
    /// The entity whose lock was contended
    pub resource: String,
    /// How long the caller waited
    pub waited_ms: u64,
}

/// Locks `mutex`, giving up after `timeout`
pub async fn lock_within<T>(
    mutex: Arc<Mutex<T>>,
    timeout: Duration,
    resource: impl fmt::Display,
) -> Result<OwnedMutexGuard<T>, LockTimeout> {
    tokio::time::timeout(timeout, mutex.lock_owned())
        .await
        .map_err(|_| LockTimeout {
            resource: resource.to_string(),
            waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
}

/// A set of named locks, one per key, created on first use
///
/// Used where the thing being serialized is an identity rather than a value,
/// e.g. "at most one invoice per consultation".
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
    timeout: Duration,
}

/// Holds a key's lock until dropped
#[derive(Debug)]
pub struct KeyedGuard {
    _guard: OwnedMutexGuard<()>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    /// Creates an empty lock set with the given bounded wait
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Returns the configured bounded wait
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of keys currently tracked
    pub async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Acquires the lock for `key`
    ///
    /// Slots nobody holds or waits on are pruned here, so the set only
    /// tracks keys that are in use.
    pub async fn acquire(&self, key: &K) -> Result<KeyedGuard, LockTimeout> {
        let slot = {
            let mut slots = self.slots.lock().await;
            // A holder or waiter keeps its own clone of the slot
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.clone()).or_default().clone()
        };
        let guard = lock_within(slot, self.timeout, key).await?;
        Ok(KeyedGuard { _guard: guard })
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}
