//! # Keyed Locks
//!
//! Serializes read-modify-write cycles on individual records. Each key gets
//! its own async mutex, created on first use; operations on different keys
//! never contend.
//!
//! When an operation needs both a file and a session lock, the file lock is
//! taken first. An entry is dropped from the table as soon as its last guard
//! is released with nobody waiting, so keys that name no record do not
//! accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Table = HashMap<String, Arc<AsyncMutex<()>>>;

/// Per-key async locks.
#[derive(Clone, Debug, Default)]
pub struct Locks {
    inner: Arc<Mutex<Table>>,
}

/// A guard holding the lock for a single key.
#[derive(Debug)]
pub struct Guard {
    key: String,
    locks: Locks,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        drop(self.held.take());

        // the table's own reference is the only one left when nobody holds or
        // waits on the key
        let mut map = self.locks.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if map.get(&self.key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
            map.remove(&self.key);
        }
    }
}

impl Locks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for, then take, the lock for `key`.
    pub async fn acquire(&self, key: &str) -> Guard {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(key.to_string()).or_default())
        };
        Guard {
            key: key.to_string(),
            locks: self.clone(),
            held: Some(mutex.lock_owned().await),
        }
    }

    /// Drop entries nobody holds or is waiting on.
    pub fn prune(&self) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_serializes() {
        let locks = Locks::new();
        let guard = locks.acquire("file:1").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire("file:1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        assert_eq!(locks.len(), 1);
        waiting.await.expect("should acquire");
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn released_keys_are_removed() {
        let locks = Locks::new();
        for n in 0..100 {
            drop(locks.acquire(&format!("session:{n}")).await);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let locks = Locks::new();
        let _a = locks.acquire("file:1").await;
        let _b = locks.acquire("file:2").await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn prune_idle() {
        let locks = Locks::new();
        let held = locks.acquire("session:a").await;
        drop(locks.acquire("session:b").await);

        locks.prune();
        assert_eq!(locks.len(), 1);

        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
