//! In-memory `SnapshotStore` implementations.

use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Semaphore, watch};
use xiuxian_core::error::StoreError;
use xiuxian_core::store::SnapshotStore;

/// A `HashMap`-backed store. Share one instance between controllers to
/// simulate a process restart.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySnapshotStore {
    /// Creates a store pre-populated with `value` under `key`.
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        store
    }

    /// Current value under `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// A store whose every operation fails with an I/O error.
#[derive(Debug)]
pub struct FailingSnapshotStore;

fn disk_full() -> StoreError {
    StoreError::Io(io::Error::other("disk full"))
}

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(disk_full())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(disk_full())
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(disk_full())
    }
}

/// An in-memory store whose writes block until the test opens the gate.
///
/// Reads and removals go straight through.
#[derive(Debug)]
pub struct GatedSnapshotStore {
    inner: InMemorySnapshotStore,
    gate: Semaphore,
    entered: watch::Sender<usize>,
}

impl Default for GatedSnapshotStore {
    fn default() -> Self {
        Self {
            inner: InMemorySnapshotStore::default(),
            gate: Semaphore::new(0),
            entered: watch::Sender::new(0),
        }
    }
}

impl GatedSnapshotStore {
    /// Lets `writes` more writes through.
    pub fn open(&self, writes: usize) {
        self.gate.add_permits(writes);
    }

    /// Resolves once `writes` writes in total have reached the gate.
    pub async fn wait_for_writes(&self, writes: usize) {
        let mut entered = self.entered.subscribe();
        let _ = entered.wait_for(|count| *count >= writes).await;
    }

    /// Current value under `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.value(key)
    }
}

#[async_trait]
impl SnapshotStore for GatedSnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entered.send_modify(|count| *count += 1);
        self.gate
            .acquire()
            .await
            .map_err(|err| StoreError::Io(io::Error::other(err)))?
            .forget();
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}
