//! The key-value byte store boundary and its in-memory implementation.

use crate::PersistenceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A flat, durable key-value byte store.
///
/// Implementations must replace a value atomically: a concurrent or later
/// `read` sees either the previous blob or the new one, never a mix. Stores
/// are shared with background mutation tasks, hence the `'static` bound.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Returns the blob stored under `key`, or `None` if nothing was ever written.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replaces the blob stored under `key`.
    async fn write(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;
}

/// Process-local [`KvStore`]. Nothing survives the process.
///
/// Writes can be switched to fail with [`set_fail_writes`](Self::set_fail_writes),
/// which lets callers exercise the store's rollback path.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    write_count: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `value` already stored under `key`.
    pub fn with_entry(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.into());
        store
    }

    /// When `true`, every subsequent `write` fails without touching the stored value.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Current raw value under `key`, bypassing the async interface.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteRejected(format!(
                "simulated failure writing '{key}'"
            )));
        }
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_vec());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
