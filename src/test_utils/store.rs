//! In-memory state and blob stores.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key/value state, serialized as JSON.
#[derive(Default, Clone, Debug)]
pub struct State {
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl State {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, state: impl Serialize, _: DateTime<Utc>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("state store unavailable");
        }
        let bytes = serde_json::to_vec(&state)?;
        self.store.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), bytes);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(bytes) = store.get(key) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(bytes)?))
    }

    pub fn purge(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("state store unavailable");
        }
        self.store.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }

    #[must_use]
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = store.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort();
        keys
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

/// File bytes, keyed by handle.
#[derive(Default, Clone, Debug)]
pub struct Blobs {
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_deletes: Arc<AtomicBool>,
}

impl Blobs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, file_id: &str, bytes: Vec<u8>) -> Result<String> {
        let handle = format!("blobs/{file_id}");
        self.store.lock().unwrap_or_else(PoisonError::into_inner).insert(handle.clone(), bytes);
        Ok(handle)
    }

    pub fn read(&self, handle: &str) -> Result<Cursor<Vec<u8>>> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = store.get(handle).ok_or_else(|| anyhow!("no blob {handle}"))?;
        Ok(Cursor::new(bytes.clone()))
    }

    pub fn delete(&self, handle: &str) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("blob store unavailable");
        }
        Ok(self.store.lock().unwrap_or_else(PoisonError::into_inner).remove(handle).is_some())
    }

    /// Overwrite stored bytes behind the service's back.
    pub fn tamper(&self, handle: &str, bytes: Vec<u8>) {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).insert(handle.to_string(), bytes);
    }

    /// Whether anything is stored under the handle.
    #[must_use]
    pub fn contains(&self, handle: &str) -> bool {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).contains_key(handle)
    }

    /// Whether no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    /// Make subsequent deletes fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}
